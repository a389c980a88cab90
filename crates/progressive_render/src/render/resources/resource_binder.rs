//! # Resource Binder
//!
//! Wraps the buffers of a drawable behind a bind object when the backend
//! supports one, so a draw needs a single bind instead of rebinding every
//! buffer.
//!
//! The strategy is chosen once in [`ResourceBinder::create`]:
//!
//! - **Bind object** (native or extension): the first `bind` activates the
//!   bind object *and* runs the buffer-binding function, which the bind
//!   object records. Later binds only activate the bind object.
//! - **Direct**: no bind object exists, every `bind`/`unbind` runs the
//!   buffer functions.
//!
//! The binder never owns the buffers. They can be shared between binders,
//! and [`ResourceBinder::delete`] only releases the bind object.

use crate::render::api::{BindObjectHandle, BindObjectSupport, RenderBackend};
use crate::render::{RenderError, RenderResult};

/// Function that binds or unbinds every buffer a drawable needs
pub type BufferBindFn = Box<dyn Fn(&mut dyn RenderBackend)>;

/// Binding strategy selected at creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindStrategy {
    BindObject {
        handle: BindObjectHandle,
        support: BindObjectSupport,
        buffers_bound: bool,
    },
    Direct,
}

/// Non-owning bind/unbind dispatcher over a set of buffers
pub struct ResourceBinder {
    label: String,
    strategy: Option<BindStrategy>,
    bind_buffers: Option<BufferBindFn>,
    unbind_buffers: Option<BufferBindFn>,
}

impl std::fmt::Debug for ResourceBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceBinder")
            .field("label", &self.label)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl ResourceBinder {
    /// Create an uninitialized binder; call [`create`](Self::create) before binding
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            strategy: None,
            bind_buffers: None,
            unbind_buffers: None,
        }
    }

    /// Select the binding strategy from the backend's capabilities
    ///
    /// Returns the allocated bind object, or `None` when the backend has no
    /// bind-object support and the binder falls back to direct binding.
    /// Creating an already created binder releases the previous bind object first.
    pub fn create(
        &mut self,
        backend: &mut dyn RenderBackend,
        bind_buffers: impl Fn(&mut dyn RenderBackend) + 'static,
        unbind_buffers: impl Fn(&mut dyn RenderBackend) + 'static,
    ) -> RenderResult<Option<BindObjectHandle>> {
        if self.strategy.is_some() {
            log::debug!("Recreating resource binder '{}'", self.label);
            self.delete(backend);
        }

        let support = backend.capabilities().bind_objects;
        let strategy = if support.is_available() {
            let handle = backend.create_bind_object()?;
            log::debug!("Resource binder '{}' uses {:?} bind object {:?}", self.label, support, handle);
            BindStrategy::BindObject { handle, support, buffers_bound: false }
        } else {
            log::debug!("Resource binder '{}' binds buffers directly", self.label);
            BindStrategy::Direct
        };

        self.strategy = Some(strategy);
        self.bind_buffers = Some(Box::new(bind_buffers));
        self.unbind_buffers = Some(Box::new(unbind_buffers));

        Ok(self.bind_object())
    }

    /// Bind the wrapped buffers for drawing
    pub fn bind(&mut self, backend: &mut dyn RenderBackend) -> RenderResult<()> {
        let (strategy, bind_buffers) = match (&mut self.strategy, &self.bind_buffers) {
            (Some(strategy), Some(bind_buffers)) => (strategy, bind_buffers),
            _ => return Err(RenderError::Uninitialized("resource binder")),
        };

        match strategy {
            BindStrategy::BindObject { handle, buffers_bound, .. } => {
                backend.bind_bind_object(Some(*handle));
                if !*buffers_bound {
                    bind_buffers(backend);
                    *buffers_bound = true;
                }
            }
            BindStrategy::Direct => bind_buffers(backend),
        }
        Ok(())
    }

    /// Undo [`bind`](Self::bind)
    ///
    /// With a bind object only the default bind object is restored; the
    /// recorded buffer bindings stay in the bind object.
    pub fn unbind(&mut self, backend: &mut dyn RenderBackend) -> RenderResult<()> {
        let (strategy, unbind_buffers) = match (&self.strategy, &self.unbind_buffers) {
            (Some(strategy), Some(unbind_buffers)) => (strategy, unbind_buffers),
            _ => return Err(RenderError::Uninitialized("resource binder")),
        };

        match strategy {
            BindStrategy::BindObject { .. } => backend.bind_bind_object(None),
            BindStrategy::Direct => unbind_buffers(backend),
        }
        Ok(())
    }

    /// Release binder-owned state
    ///
    /// Deletes the bind object if one exists and clears the one-time latch.
    /// The wrapped buffers are never released here.
    pub fn delete(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(BindStrategy::BindObject { handle, .. }) = self.strategy {
            backend.delete_bind_object(handle);
        }
        self.strategy = None;
        self.bind_buffers = None;
        self.unbind_buffers = None;
    }

    /// Whether [`create`](Self::create) has run and [`delete`](Self::delete) has not
    pub fn is_initialized(&self) -> bool {
        self.strategy.is_some()
    }

    /// The bind object in use, if any
    pub fn bind_object(&self) -> Option<BindObjectHandle> {
        match self.strategy {
            Some(BindStrategy::BindObject { handle, .. }) => Some(handle),
            _ => None,
        }
    }

    /// Bind-object tier this binder was created with
    pub fn support(&self) -> Option<BindObjectSupport> {
        match self.strategy {
            Some(BindStrategy::BindObject { support, .. }) => Some(support),
            Some(BindStrategy::Direct) => Some(BindObjectSupport::Unsupported),
            None => None,
        }
    }

    /// Label used in diagnostics
    pub fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::{BackendCapabilities, BufferHandle};
    use crate::render::backends::software::{BackendCall, SoftwareBackend};
    use std::cell::Cell;
    use std::rc::Rc;

    fn backend_with(support: BindObjectSupport) -> SoftwareBackend {
        SoftwareBackend::with_capabilities((4, 4), BackendCapabilities { bind_objects: support })
    }

    fn counting_binder(
        backend: &mut SoftwareBackend,
    ) -> (ResourceBinder, Rc<Cell<u32>>, Rc<Cell<u32>>, Option<BindObjectHandle>) {
        let binds = Rc::new(Cell::new(0));
        let unbinds = Rc::new(Cell::new(0));
        let (b, u) = (binds.clone(), unbinds.clone());

        let mut binder = ResourceBinder::new("test");
        let handle = binder
            .create(
                backend,
                move |backend| {
                    b.set(b.get() + 1);
                    backend.bind_buffer(BufferHandle(7));
                },
                move |backend| {
                    u.set(u.get() + 1);
                    backend.unbind_buffer(BufferHandle(7));
                },
            )
            .unwrap();
        (binder, binds, unbinds, handle)
    }

    #[test]
    fn test_bind_before_create_is_precondition_error() {
        let mut backend = backend_with(BindObjectSupport::Native);
        let mut binder = ResourceBinder::new("uninitialized");

        assert!(matches!(binder.bind(&mut backend), Err(RenderError::Uninitialized(_))));
        assert!(matches!(binder.unbind(&mut backend), Err(RenderError::Uninitialized(_))));
    }

    #[test]
    fn test_bind_object_binds_buffers_once() {
        let mut backend = backend_with(BindObjectSupport::Native);
        let (mut binder, binds, unbinds, handle) = counting_binder(&mut backend);
        assert!(handle.is_some());

        for _ in 0..10 {
            binder.bind(&mut backend).unwrap();
            binder.unbind(&mut backend).unwrap();
        }

        assert_eq!(binds.get(), 1);
        assert_eq!(unbinds.get(), 0);
        assert_eq!(binder.support(), Some(BindObjectSupport::Native));
    }

    #[test]
    fn test_extension_support_also_latches() {
        let mut backend = backend_with(BindObjectSupport::Extension);
        let (mut binder, binds, _, _) = counting_binder(&mut backend);

        binder.bind(&mut backend).unwrap();
        binder.bind(&mut backend).unwrap();

        assert_eq!(binds.get(), 1);
        assert_eq!(binder.support(), Some(BindObjectSupport::Extension));
    }

    #[test]
    fn test_direct_fallback_binds_every_time() {
        let mut backend = backend_with(BindObjectSupport::Unsupported);
        let (mut binder, binds, unbinds, handle) = counting_binder(&mut backend);
        assert!(handle.is_none());

        for _ in 0..5 {
            binder.bind(&mut backend).unwrap();
            binder.unbind(&mut backend).unwrap();
        }

        assert_eq!(binds.get(), 5);
        assert_eq!(unbinds.get(), 5);
        assert_eq!(backend.live_bind_objects(), 0);
    }

    #[test]
    fn test_unbind_with_bind_object_restores_default_only() {
        let mut backend = backend_with(BindObjectSupport::Native);
        let (mut binder, _, _, handle) = counting_binder(&mut backend);

        binder.bind(&mut backend).unwrap();
        backend.clear_calls();
        binder.unbind(&mut backend).unwrap();

        assert_eq!(backend.calls(), &[BackendCall::BindBindObject(None)]);
        assert!(handle.is_some());
    }

    #[test]
    fn test_delete_releases_bind_object_but_not_buffers() {
        let mut backend = backend_with(BindObjectSupport::Native);
        let (mut binder, binds, _, handle) = counting_binder(&mut backend);
        binder.bind(&mut backend).unwrap();
        assert_eq!(backend.live_bind_objects(), 1);

        backend.clear_calls();
        binder.delete(&mut backend);

        assert_eq!(backend.live_bind_objects(), 0);
        assert_eq!(backend.calls(), &[BackendCall::DeleteBindObject(handle.unwrap())]);
        assert!(!binder.is_initialized());
        assert!(binder.bind(&mut backend).is_err());
        assert_eq!(binds.get(), 1);
    }

    #[test]
    fn test_recreate_resets_latch() {
        let mut backend = backend_with(BindObjectSupport::Native);
        let (mut binder, binds, _, _) = counting_binder(&mut backend);
        binder.bind(&mut backend).unwrap();

        let b = binds.clone();
        binder
            .create(&mut backend, move |_| b.set(b.get() + 1), |_| {})
            .unwrap();
        binder.bind(&mut backend).unwrap();
        binder.bind(&mut backend).unwrap();

        assert_eq!(binds.get(), 2);
        assert_eq!(backend.live_bind_objects(), 1);
    }
}
