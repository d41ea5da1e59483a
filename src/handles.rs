//! Scoped ownership of store handles.
use crate::store::{Backend, Hid, StoreError};
use std::ops::{Deref, DerefMut};

/// The handles opened by one operation.
///
/// Every handle acquired through the scope is closed when the scope is
/// dropped, most recent first, whichever way the operation exits. Handles
/// that are no longer valid at that point are skipped, so a handle is never
/// closed twice.
pub struct HandleScope<'a, B: Backend + ?Sized> {
    backend: &'a mut B,
    handles: Vec<Hid>,
}

impl<'a, B: Backend + ?Sized> HandleScope<'a, B> {
    /// An empty scope over `backend`.
    pub fn new(backend: &'a mut B) -> Self {
        Self { backend, handles: Vec::new() }
    }

    /// Opens a handle with `open` and takes ownership of it.
    ///
    /// Nothing is recorded if `open` fails.
    pub fn acquire<F>(&mut self, open: F) -> Result<Hid, StoreError>
    where
        F: FnOnce(&mut B) -> Result<Hid, StoreError>,
    {
        let hid = open(&mut *self.backend)?;
        self.handles.push(hid);
        Ok(hid)
    }

    /// The backend, for calls that do not open handles.
    pub fn backend(&mut self) -> &mut B {
        &mut *self.backend
    }

    /// Closes `hid` ahead of the rest of the scope.
    pub fn release(&mut self, hid: Hid) -> Result<(), StoreError> {
        if let Some(pos) = self.handles.iter().rposition(|&h| h == hid) {
            self.handles.remove(pos);
        }
        self.backend.close(hid)
    }

    /// Handles currently owned, in acquisition order.
    pub fn held(&self) -> &[Hid] {
        &self.handles
    }

    /// Silences the backend's error reporting until the guard is dropped.
    pub fn quiet(&mut self) -> Quiet<'_, B> {
        Quiet::new(&mut *self.backend)
    }
}

impl<B: Backend + ?Sized> Drop for HandleScope<'_, B> {
    fn drop(&mut self) {
        while let Some(hid) = self.handles.pop() {
            if !self.backend.is_valid(hid) {
                continue;
            }
            if let Err(err) = self.backend.close(hid) {
                tracing::warn!(%hid, %err, "failed to release handle");
            }
        }
    }
}

/// Backend access with error reporting turned off.
///
/// Used around checks whose failure is an expected answer. The previous
/// reporting state is restored on drop.
pub struct Quiet<'a, B: Backend + ?Sized> {
    backend: &'a mut B,
    previous: bool,
}

impl<'a, B: Backend + ?Sized> Quiet<'a, B> {
    /// Turns reporting off on `backend`.
    pub fn new(backend: &'a mut B) -> Self {
        let previous = backend.error_reporting();
        backend.set_error_reporting(false);
        Self { backend, previous }
    }
}

impl<B: Backend + ?Sized> Deref for Quiet<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        &*self.backend
    }
}

impl<B: Backend + ?Sized> DerefMut for Quiet<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        &mut *self.backend
    }
}

impl<B: Backend + ?Sized> Drop for Quiet<'_, B> {
    fn drop(&mut self) {
        self.backend.set_error_reporting(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dtype::{ByteOrder, Datatype},
        store::ZarrBackend,
    };

    #[test]
    fn scope_closes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = ZarrBackend::new();
        {
            let mut scope = HandleScope::new(&mut backend);
            let file = scope.acquire(|b| b.create_container(&dir.path().join("c"))).unwrap();
            let space = scope.acquire(|b| b.create_scalar_space()).unwrap();
            let dtype = scope
                .acquire(|b| b.create_type(&Datatype::float(8, ByteOrder::NATIVE)))
                .unwrap();
            assert_eq!(scope.held(), &[file, space, dtype]);
            scope.release(space).unwrap();
            assert_eq!(scope.held(), &[file, dtype]);
            assert!(scope.acquire(|b| b.open_object(file, "missing")).is_err());
            assert_eq!(scope.held().len(), 2);
        }
        assert_eq!(backend.open_handles(), 0);
    }

    #[test]
    fn handles_closed_elsewhere_are_skipped() {
        let mut backend = ZarrBackend::new();
        {
            let mut scope = HandleScope::new(&mut backend);
            let space = scope.acquire(|b| b.create_scalar_space()).unwrap();
            scope.backend().close(space).unwrap();
        }
        assert_eq!(backend.open_handles(), 0);
    }

    #[test]
    fn quiet_restores_reporting() {
        let mut backend = ZarrBackend::new();
        backend.set_error_reporting(true);
        {
            let mut scope = HandleScope::new(&mut backend);
            let quiet = scope.quiet();
            assert!(!quiet.error_reporting());
        }
        assert!(backend.error_reporting());
        backend.set_error_reporting(false);
        drop(Quiet::new(&mut backend));
        assert!(!backend.error_reporting());
    }
}
