use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::Instance,
        model::{Material, Model},
    },
    render::Instanced,
};

/**
 * An `InstanceBatch` draws one model many times in a single instanced call.
 *
 * The instance buffer only ever grows. Replacing the batch with fewer
 * instances reuses the existing allocation and only draws the used prefix.
 */
pub struct InstanceBatch {
    pub model: Model,
    instances: Vec<Instance>,
    instance_buffer: wgpu::Buffer,
    capacity: usize,
}

impl InstanceBatch {
    pub fn new(device: &wgpu::Device, model: Model, instances: Vec<Instance>) -> Self {
        let capacity = instances.len().max(1);
        let instance_buffer = mk_instance_buffer(device, &instances, capacity);
        Self {
            model,
            instances,
            instance_buffer,
            capacity,
        }
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Drop every current instance and upload `instances` in their place.
    pub fn replace(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, instances: Vec<Instance>) {
        self.instances.clear();
        self.instances = instances;
        if self.instances.len() > self.capacity {
            self.instance_buffer.destroy();
            self.capacity = self.instances.len().next_power_of_two();
            self.instance_buffer = mk_instance_buffer(device, &self.instances, self.capacity);
        } else if !self.instances.is_empty() {
            let data = self.instances.iter().map(Instance::to_raw).collect::<Vec<_>>();
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&data));
        }
    }

    /// Draw item for the render loop, `None` while there is nothing to draw.
    pub fn instanced<'a>(&'a self, material: &'a Material) -> Option<Instanced<'a>> {
        if self.instances.is_empty() || self.model.is_empty() {
            return None;
        }
        Some(Instanced {
            instance: &self.instance_buffer,
            model: &self.model,
            material,
            amount: self.instances.len(),
        })
    }

    pub fn destroy(&self) {
        self.instance_buffer.destroy();
        self.model.destroy();
    }
}

fn mk_instance_buffer(device: &wgpu::Device, instances: &[Instance], capacity: usize) -> wgpu::Buffer {
    let mut data = instances.iter().map(Instance::to_raw).collect::<Vec<_>>();
    data.resize(capacity.max(data.len()), bytemuck::Zeroable::zeroed());
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Instance Buffer"),
        contents: bytemuck::cast_slice(&data),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    })
}
