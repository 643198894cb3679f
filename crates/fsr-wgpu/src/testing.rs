//! Recording backend for unit tests
//!
//! Tracks every allocation, upload, dispatch, and fence so tests can assert on
//! resource lifetimes and pass ordering without a GPU. Using a destroyed handle or
//! destroying one twice panics.

use crate::{ComputeBackend, DispatchGrid, Extent, FsrError, KernelInput, KernelInvocation, KernelRole, Result};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MockImage {
    pub id: u32,
    pub extent: Extent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MockParamBuffer {
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MockKernel {
    pub role: KernelRole,
    pub entry_point: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MockEvent {
    CreateImage {
        id: u32,
        extent: Extent,
    },
    DestroyImage {
        id: u32,
    },
    CreateParamBuffer {
        id: u32,
    },
    WriteParamBuffer {
        id: u32,
    },
    DestroyParamBuffer {
        id: u32,
    },
    Submit {
        role: KernelRole,
        source: Option<u32>,
        target: u32,
        params: u32,
        grid: DispatchGrid,
    },
    Fence,
}

#[derive(Debug)]
pub(crate) struct MockBackend {
    max_image_dimension: u32,
    next_id: u32,
    inputs: HashSet<u32>,
    images: HashMap<u32, Extent>,
    param_buffers: HashMap<u32, Vec<u8>>,
    images_created: usize,
    images_destroyed: usize,
    param_buffers_created: usize,
    compiled: Vec<MockKernel>,
    events: Vec<MockEvent>,
    fail_next_submit: Option<String>,
    fail_next_image: Option<String>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::with_max_image_dimension(16384)
    }
}

impl MockBackend {
    pub fn with_max_image_dimension(max_image_dimension: u32) -> Self {
        Self {
            max_image_dimension,
            next_id: 1,
            inputs: HashSet::new(),
            images: HashMap::new(),
            param_buffers: HashMap::new(),
            images_created: 0,
            images_destroyed: 0,
            param_buffers_created: 0,
            compiled: Vec::new(),
            events: Vec::new(),
            fail_next_submit: None,
            fail_next_image: None,
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Source image owned by the caller, not counted as a live output image
    pub fn input_image(&mut self, extent: Extent) -> MockImage {
        let id = self.next_id();
        self.inputs.insert(id);
        MockImage { id, extent }
    }

    pub fn fail_next_submit(&mut self, reason: &str) {
        self.fail_next_submit = Some(reason.to_string());
    }

    pub fn fail_next_image_allocation(&mut self, reason: &str) {
        self.fail_next_image = Some(reason.to_string());
    }

    pub fn events(&self) -> &[MockEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn submitted_roles(&self) -> Vec<KernelRole> {
        self.events
            .iter()
            .filter_map(|event| match event {
                MockEvent::Submit { role, .. } => Some(*role),
                _ => None,
            })
            .collect()
    }

    pub fn submitted_grids(&self) -> Vec<DispatchGrid> {
        self.events
            .iter()
            .filter_map(|event| match event {
                MockEvent::Submit { grid, .. } => Some(*grid),
                _ => None,
            })
            .collect()
    }

    pub fn compiled_roles(&self) -> Vec<KernelRole> {
        self.compiled.iter().map(|kernel| kernel.role).collect()
    }

    pub fn compiled_entry_points(&self) -> Vec<String> {
        self.compiled.iter().map(|kernel| kernel.entry_point.clone()).collect()
    }

    pub fn image_extent(&self, image: &MockImage) -> Option<Extent> {
        self.images.get(&image.id).copied()
    }

    pub fn live_images(&self) -> usize {
        self.images.len()
    }

    pub fn images_created(&self) -> usize {
        self.images_created
    }

    pub fn images_destroyed(&self) -> usize {
        self.images_destroyed
    }

    pub fn live_param_buffers(&self) -> usize {
        self.param_buffers.len()
    }

    pub fn param_buffers_created(&self) -> usize {
        self.param_buffers_created
    }

    pub fn param_buffer_contents(&self, id: u32) -> Option<&[u8]> {
        self.param_buffers.get(&id).map(Vec::as_slice)
    }

    fn assert_image_alive(&self, id: u32) {
        assert!(self.images.contains_key(&id) || self.inputs.contains(&id), "image {id} used after destroy");
    }
}

impl ComputeBackend for MockBackend {
    type Image = MockImage;
    type ParamBuffer = MockParamBuffer;
    type Kernel = MockKernel;

    fn max_image_dimension(&self) -> u32 {
        self.max_image_dimension
    }

    fn compile_kernel(&mut self, role: KernelRole, _source: &str, entry_point: &str) -> Result<MockKernel> {
        let kernel = MockKernel {
            role,
            entry_point: entry_point.to_string(),
        };
        self.compiled.push(kernel.clone());
        Ok(kernel)
    }

    fn create_image(&mut self, extent: Extent) -> Result<MockImage> {
        if let Some(reason) = self.fail_next_image.take() {
            return Err(FsrError::ResourceAllocation { extent, reason });
        }
        let id = self.next_id();
        self.images.insert(id, extent);
        self.images_created += 1;
        self.events.push(MockEvent::CreateImage { id, extent });
        Ok(MockImage { id, extent })
    }

    fn destroy_image(&mut self, image: MockImage) {
        assert!(self.images.remove(&image.id).is_some(), "image {} destroyed twice", image.id);
        self.images_destroyed += 1;
        self.events.push(MockEvent::DestroyImage { id: image.id });
    }

    fn create_param_buffer(&mut self, size: u64) -> Result<MockParamBuffer> {
        let id = self.next_id();
        self.param_buffers.insert(id, vec![0; size as usize]);
        self.param_buffers_created += 1;
        self.events.push(MockEvent::CreateParamBuffer { id });
        Ok(MockParamBuffer { id })
    }

    fn write_param_buffer(&mut self, buffer: &MockParamBuffer, bytes: &[u8]) -> Result<()> {
        let contents = self.param_buffers.get_mut(&buffer.id).expect("parameter buffer used after destroy");
        assert_eq!(contents.len(), bytes.len(), "parameter uploads must replace the whole buffer");
        contents.copy_from_slice(bytes);
        self.events.push(MockEvent::WriteParamBuffer { id: buffer.id });
        Ok(())
    }

    fn destroy_param_buffer(&mut self, buffer: MockParamBuffer) {
        assert!(self.param_buffers.remove(&buffer.id).is_some(), "parameter buffer {} destroyed twice", buffer.id);
        self.events.push(MockEvent::DestroyParamBuffer { id: buffer.id });
    }

    fn submit(&mut self, invocation: &KernelInvocation<'_, Self>) -> Result<()> {
        if let Some(reason) = self.fail_next_submit.take() {
            return Err(FsrError::DeviceExecution {
                kernel: invocation.role.name(),
                reason,
            });
        }

        assert_eq!(invocation.kernel.role, invocation.role, "kernel bound to the wrong role");
        assert!(self.param_buffers.contains_key(&invocation.params.id), "parameter buffer used after destroy");
        self.assert_image_alive(invocation.target.id);
        let source = match invocation.source {
            KernelInput::Image(image) => {
                assert!(!invocation.role.is_in_place(), "{} must run in place", invocation.role);
                self.assert_image_alive(image.id);
                Some(image.id)
            }
            KernelInput::InPlace => {
                assert!(invocation.role.is_in_place(), "{} cannot run in place", invocation.role);
                None
            }
        };

        self.events.push(MockEvent::Submit {
            role: invocation.role,
            source,
            target: invocation.target.id,
            params: invocation.params.id,
            grid: invocation.grid,
        });
        Ok(())
    }

    fn fence(&mut self) -> Result<()> {
        self.events.push(MockEvent::Fence);
        Ok(())
    }
}
