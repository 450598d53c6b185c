//! Code-unit view of engine strings.
//!
//! Strings are stored as UTF-8, but indexing and `length` are defined over
//! UTF-16 code units. Converting on every access makes a loop over a
//! string quadratic, so the runtime keeps the units of the most recently
//! indexed string. The cache holds its own `Rc`, so a pointer match always
//! names the same live string.

use std::cell::RefCell;
use std::rc::Rc;

/// Strings this short are converted directly.
const CACHE_THRESHOLD: usize = 32;

#[derive(Debug, Default)]
pub(crate) struct Utf16Cache {
    last: RefCell<Option<(Rc<str>, Rc<[u16]>)>>,
}

impl Utf16Cache {
    /// UTF-16 units of `s`.
    pub(crate) fn units(&self, s: &Rc<str>) -> Rc<[u16]> {
        if s.len() <= CACHE_THRESHOLD {
            return s.encode_utf16().collect();
        }
        let mut last = self.last.borrow_mut();
        if let Some((cached, units)) = last.as_ref() {
            if Rc::ptr_eq(cached, s) {
                return Rc::clone(units);
            }
        }
        let units: Rc<[u16]> = s.encode_utf16().collect();
        *last = Some((Rc::clone(s), Rc::clone(&units)));
        units
    }

    /// Code unit at `index`.
    pub(crate) fn unit_at(&self, s: &Rc<str>, index: usize) -> Option<u16> {
        self.units(s).get(index).copied()
    }

    /// Length in code units.
    pub(crate) fn len(&self, s: &Rc<str>) -> usize {
        if s.len() <= CACHE_THRESHOLD {
            return s.encode_utf16().count();
        }
        self.units(s).len()
    }
}
