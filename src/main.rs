use matcap_donuts::scene::config::DemoConfig;

fn main() -> anyhow::Result<()> {
    matcap_donuts::run_demo(DemoConfig::default())
}
