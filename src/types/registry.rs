//! Process-wide table of canonical descriptors

use super::descr::Descr;
use super::dtype::TypeTag;
use once_cell::sync::Lazy;
use std::sync::Arc;

static BUILTINS: Lazy<Vec<Arc<Descr>>> = Lazy::new(|| {
    TypeTag::ALL
        .iter()
        .map(|&tag| Arc::new(Descr::new_builtin(tag)))
        .collect()
});

/// Canonical native descriptor for `tag`, shared by every caller
pub(crate) fn lookup(tag: TypeTag) -> Arc<Descr> {
    Arc::clone(&BUILTINS[tag as usize])
}

/// Whether `descr` is the registry's own instance
pub fn is_canonical(descr: &Arc<Descr>) -> bool {
    Arc::ptr_eq(descr, &BUILTINS[descr.tag() as usize])
}
