//! Numeric handle types for the FFI-shaped control surface (§6). These are
//! part of the core data model, not the excluded `extern "C"` glue, so they
//! are implemented regardless of what sits on the other side of them.
//!
//! 1-based; 0 is reserved for "undefined" at the eventual FFI boundary, so
//! each handle wraps a `NonZeroU32` except `PluginInstanceIndex`, which is a
//! plain index into a chain and renumbers when entries are deleted.

use std::num::NonZeroU32;

macro_rules! handle_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(NonZeroU32);

        impl $name {
            pub fn new(value: u32) -> Option<Self> {
                NonZeroU32::new(value).map(Self)
            }

            pub fn get(self) -> u32 {
                self.0.get()
            }
        }
    };
}

handle_id!(AudioInputId);
handle_id!(TrackId);
handle_id!(PluginId);
handle_id!(ProgramId);

/// An index into a probe's effect chain. Not stable: deleting an earlier
/// entry renumbers every index after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginInstanceIndex(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_round_trips_its_value() {
        let id = TrackId::new(3).unwrap();
        assert_eq!(id.get(), 3);
    }

    #[test]
    fn zero_is_not_a_valid_handle() {
        assert!(TrackId::new(0).is_none());
    }
}
