//! GPU texture resource.

use std::sync::Arc;

use super::ResourceId;
use crate::backend::GpuHandle;
use crate::device::GraphicsDevice;
use crate::types::{Extent3d, TextureDescriptor, TextureFormat, TextureType, TextureUsage};

/// A GPU texture resource.
///
/// Textures are created by [`GraphicsDevice::create_texture`] and are reference-counted.
/// They hold a strong reference to their parent device, keeping it alive.
///
/// # Example
///
/// ```ignore
/// let texture = device.create_texture(&TextureDescriptor::new_2d(
///     1920, 1080,
///     TextureFormat::Rgba8Unorm,
///     TextureUsage::RENDER_ATTACHMENT,
/// ))?;
/// println!("Texture size: {}x{}", texture.width(), texture.height());
/// ```
pub struct Texture {
    id: ResourceId,
    handle: GpuHandle,
    device: Arc<GraphicsDevice>,
    descriptor: TextureDescriptor,
}

impl Texture {
    pub(crate) fn new(
        id: ResourceId,
        handle: GpuHandle,
        device: Arc<GraphicsDevice>,
        descriptor: TextureDescriptor,
    ) -> Self {
        Self {
            id,
            handle,
            device,
            descriptor,
        }
    }

    /// Device-unique identifier.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Backend handle.
    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    /// Get the parent device.
    pub fn device(&self) -> &Arc<GraphicsDevice> {
        &self.device
    }

    /// Get the texture descriptor.
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    /// Get the texture dimensionality.
    pub fn texture_type(&self) -> TextureType {
        self.descriptor.texture_type
    }

    /// Get the texture size.
    pub fn size(&self) -> Extent3d {
        self.descriptor.size
    }

    /// Get the texture width.
    pub fn width(&self) -> u32 {
        self.descriptor.size.width
    }

    /// Get the texture height.
    pub fn height(&self) -> u32 {
        self.descriptor.size.height
    }

    /// Get the texture format.
    pub fn format(&self) -> TextureFormat {
        self.descriptor.format
    }

    /// Get the usage flags.
    pub fn usage(&self) -> TextureUsage {
        self.descriptor.usage
    }

    /// Get the texture label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        log::trace!("Destroying texture {} ({:?})", self.id, self.descriptor.label);
        self.device.backend().destroy_texture(self.handle);
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("size", &self.descriptor.size)
            .field("format", &self.descriptor.format)
            .field("usage", &self.descriptor.usage)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Texture: Send, Sync);

#[cfg(test)]
mod tests {
    use crate::backend::dummy::{DummyBackend, ObjectKind};
    use crate::device::GraphicsDevice;
    use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};
    use std::sync::Arc;

    #[test]
    fn accessors_reflect_descriptor() {
        let device = GraphicsDevice::new(Arc::new(DummyBackend::new()));
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(
                    320,
                    200,
                    TextureFormat::Rgba16Float,
                    TextureUsage::TEXTURE_BINDING,
                )
                .with_label("hdr"),
            )
            .unwrap();

        assert_eq!(texture.width(), 320);
        assert_eq!(texture.height(), 200);
        assert_eq!(texture.format(), TextureFormat::Rgba16Float);
        assert_eq!(texture.label(), Some("hdr"));
    }

    #[test]
    fn drop_destroys_backend_texture() {
        let backend = Arc::new(DummyBackend::new());
        let device = GraphicsDevice::new(backend.clone());
        let texture = device
            .create_texture(&TextureDescriptor::new_2d(
                8,
                8,
                TextureFormat::R8Unorm,
                TextureUsage::COPY_DST,
            ))
            .unwrap();
        assert_eq!(backend.live_count(ObjectKind::Texture), 1);

        drop(texture);
        assert_eq!(backend.live_count(ObjectKind::Texture), 0);
    }
}
