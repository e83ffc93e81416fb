//! Fixed-capacity per-frame history storage.
//!
//! Both rings map a frame to the slot `frame % capacity` and keep a
//! parallel array of frame tags beside the payload array. A slot whose tag
//! equals the requested frame holds that frame's value; a recurring slot
//! index silently evicts the previous occupant; [`Frame::NONE`] tags slots
//! that were never written. The tag array replaces a parallel `bool` array,
//! halving the auxiliary memory and removing one branch per lookup.
//!
//! All storage is allocated at construction; reads and writes never
//! allocate.
//!
//! [`Frame::NONE`]: crate::Frame::NONE

mod input_ring;
mod snapshot_ring;

pub use input_ring::InputRing;
pub use snapshot_ring::SnapshotRing;
