//! Command-recording backend.
//!
//! Translates every draw into the command stream a hardware driver would
//! emit: vertex buffer bindings, a vertex element layout, an optional index
//! buffer and one draw command per primitive run. Application memory is
//! copied into the stream buffer before the commands are recorded, so no
//! command refers to memory the backend does not own.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::SplitLimits;
use crate::error::{DrawError, DrawResult};
use crate::resources::{BufferObject, Upload, Uploader};
use crate::types::{IndexData, IndexSize, PrimMode};
use crate::vertex::{BindingSource, VertexBufferBinding, VertexElement};

use super::{BackendCaps, BackendDraw, DrawBackend};

/// Alignment of uploaded vertex data.
const VERTEX_UPLOAD_ALIGNMENT: usize = 16;

/// A bound vertex buffer.
#[derive(Debug, Clone)]
pub struct BoundVertexBuffer {
    pub buffer: Arc<BufferObject>,
    pub offset: usize,
    pub stride: u32,
    pub divisor: u32,
}

/// One recorded command.
#[derive(Debug, Clone)]
pub enum Command {
    BindVertexBuffers(Vec<BoundVertexBuffer>),
    SetVertexElements(Vec<VertexElement>),
    BindIndexBuffer {
        buffer: Arc<BufferObject>,
        offset: usize,
        size: IndexSize,
    },
    Draw {
        mode: PrimMode,
        start: u32,
        count: u32,
        base_vertex: i32,
        instance_count: u32,
        base_instance: u32,
        min_index: u32,
        max_index: u32,
        indexed: bool,
        draw_id: u32,
    },
}

/// Backend that records commands instead of executing them.
#[derive(Debug)]
pub struct CommandBackend {
    uploader: Mutex<Uploader>,
    commands: Mutex<Vec<Command>>,
    caps: BackendCaps,
}

impl Default for CommandBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBackend {
    /// Create a command backend that honors base vertex.
    pub fn new() -> Self {
        Self {
            uploader: Mutex::new(Uploader::new(Uploader::DEFAULT_CAPACITY, "command")),
            commands: Mutex::new(Vec::new()),
            caps: BackendCaps {
                supports_base_vertex: true,
                ..BackendCaps::default()
            },
        }
    }

    /// Set the largest draw the backend accepts.
    pub fn with_limits(mut self, limits: SplitLimits) -> Self {
        self.caps.limits = limits;
        self
    }

    /// Set whether indexed draws honor base vertex.
    pub fn with_base_vertex(mut self, supported: bool) -> Self {
        self.caps.supports_base_vertex = supported;
        self
    }

    /// Take the commands recorded so far.
    pub fn take_commands(&self) -> Vec<Command> {
        std::mem::take(&mut *self.commands.lock())
    }

    /// Number of draw commands recorded so far.
    pub fn draw_count(&self) -> usize {
        self.commands
            .lock()
            .iter()
            .filter(|c| matches!(c, Command::Draw { .. }))
            .count()
    }

    /// Bytes of a user binding the draw can read.
    fn binding_extent(
        binding: &VertexBufferBinding<'_>,
        index: u32,
        elements: &[VertexElement],
        draw: &BackendDraw<'_>,
    ) -> usize {
        let element_end = elements
            .iter()
            .filter(|e| e.binding == index)
            .map(|e| e.relative_offset as usize + e.format.element_size())
            .max()
            .unwrap_or(0);
        let count = if binding.stride == 0 {
            1
        } else if binding.divisor > 0 {
            draw.instances.base as usize + draw.instances.count.div_ceil(binding.divisor) as usize
        } else {
            draw.bounds.max as usize + 1
        };
        (count - 1) * binding.stride as usize + element_end
    }

    fn bind_vertex_buffers(&self, draw: &BackendDraw<'_>) -> DrawResult<Vec<BoundVertexBuffer>> {
        let state = draw.vertex_state;
        let mut bound = Vec::with_capacity(state.bindings.len());
        for (index, binding) in state.bindings.iter().enumerate() {
            let (buffer, offset) = match &binding.source {
                BindingSource::Buffer(buffer) => (Arc::clone(buffer), binding.offset),
                BindingSource::User(data) => {
                    let len = Self::binding_extent(binding, index as u32, &state.elements, draw);
                    let end = binding.offset + len;
                    let bytes = data.get(binding.offset..end).ok_or(DrawError::OutOfBounds {
                        what: "user vertex binding",
                        needed: end,
                        available: data.len(),
                    })?;
                    let Upload { buffer, offset } = self.upload(bytes, VERTEX_UPLOAD_ALIGNMENT)?;
                    (buffer, offset)
                }
            };
            bound.push(BoundVertexBuffer {
                buffer,
                offset,
                stride: binding.stride,
                divisor: binding.divisor,
            });
        }
        Ok(bound)
    }
}

impl DrawBackend for CommandBackend {
    fn name(&self) -> &'static str {
        "CommandBackend"
    }

    fn caps(&self) -> BackendCaps {
        self.caps
    }

    fn upload(&self, bytes: &[u8], alignment: usize) -> DrawResult<Upload> {
        log::trace!("CommandBackend: uploading {} bytes", bytes.len());
        self.uploader.lock().upload(bytes, alignment)
    }

    fn draw(&self, draw: &BackendDraw<'_>) -> DrawResult<()> {
        let mut commands = vec![
            Command::BindVertexBuffers(self.bind_vertex_buffers(draw)?),
            Command::SetVertexElements(draw.vertex_state.elements.clone()),
        ];

        if let Some(index) = draw.index {
            let (buffer, offset) = match &index.data {
                IndexData::Buffer { buffer, offset } => (Arc::clone(buffer), *offset),
                IndexData::Client(bytes) => {
                    let len = index.byte_len();
                    let bytes = bytes.get(..len).ok_or(DrawError::OutOfBounds {
                        what: "index data",
                        needed: len,
                        available: bytes.len(),
                    })?;
                    let Upload { buffer, offset } = self.upload(bytes, index.size.bytes())?;
                    (buffer, offset)
                }
            };
            commands.push(Command::BindIndexBuffer {
                buffer,
                offset,
                size: index.size,
            });
        }

        for prim in draw.prims.iter().filter(|p| p.count > 0) {
            commands.push(Command::Draw {
                mode: prim.mode,
                start: prim.start,
                count: prim.count,
                base_vertex: prim.base_vertex,
                instance_count: draw.instances.count,
                base_instance: draw.instances.base,
                min_index: draw.bounds.min,
                max_index: draw.bounds.max,
                indexed: draw.index.is_some(),
                draw_id: prim.draw_id,
            });
        }

        log::trace!(
            "CommandBackend: recorded {} commands for {} prims",
            commands.len(),
            draw.prims.len()
        );
        self.commands.lock().extend(commands);
        Ok(())
    }
}

static_assertions::assert_impl_all!(CommandBackend: Send, Sync);
