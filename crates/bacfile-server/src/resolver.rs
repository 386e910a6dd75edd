use crate::file::FileObject;
use bacfile_core::types::ObjectId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Looks up file objects by identifier.
pub trait ObjectResolver {
    fn resolve(&self, object_id: ObjectId) -> Option<FileObject>;
}

impl<T: ObjectResolver + ?Sized> ObjectResolver for &T {
    fn resolve(&self, object_id: ObjectId) -> Option<FileObject> {
        (**self).resolve(object_id)
    }
}

impl<T: ObjectResolver + ?Sized> ObjectResolver for Arc<T> {
    fn resolve(&self, object_id: ObjectId) -> Option<FileObject> {
        (**self).resolve(object_id)
    }
}

/// In-memory object table. Objects can be added and removed while a device
/// is serving requests.
#[derive(Debug, Default)]
pub struct ObjectTable {
    objects: RwLock<HashMap<ObjectId, FileObject>>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the object registered under `object_id`.
    pub fn insert(&self, object_id: ObjectId, object: FileObject) -> Option<FileObject> {
        log::debug!(
            "object table: registering {object_id} ({:?})",
            object.access_method()
        );
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(object_id, object)
    }

    pub fn remove(&self, object_id: ObjectId) -> Option<FileObject> {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&object_id)
    }

    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectResolver for ObjectTable {
    fn resolve(&self, object_id: ObjectId) -> Option<FileObject> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&object_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::{ObjectResolver, ObjectTable};
    use crate::file::FileObject;
    use crate::memory::MemoryStreamFile;
    use bacfile_core::types::ObjectId;
    use std::sync::Arc;

    #[test]
    fn insert_resolve_remove() {
        let table = ObjectTable::new();
        assert!(table.is_empty());

        let id = ObjectId::file(3);
        assert!(table
            .insert(id, FileObject::stream(MemoryStreamFile::new(vec![1, 2])))
            .is_none());
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve(id).map(|o| o.len()), Some(2));
        assert!(table.resolve(ObjectId::file(4)).is_none());

        assert!(table.remove(id).is_some());
        assert!(table.resolve(id).is_none());
    }

    #[test]
    fn shared_table_resolves_through_arc() {
        let table = Arc::new(ObjectTable::new());
        table.insert(
            ObjectId::file(1),
            FileObject::stream(MemoryStreamFile::default()),
        );
        fn resolves<R: ObjectResolver>(resolver: R, id: ObjectId) -> bool {
            resolver.resolve(id).is_some()
        }
        assert!(resolves(Arc::clone(&table), ObjectId::file(1)));
        assert!(resolves(&*table, ObjectId::file(1)));
        assert!(!resolves(table, ObjectId::file(2)));
    }
}
