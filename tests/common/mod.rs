//! Integration test common infrastructure.
//!
//! Provides stub servers for the two parties the gate talks to (the
//! identity provider and the upstream archive) plus a harness that runs
//! the gate itself on a real listener, so tests drive everything over
//! HTTP exactly like a browser would.

pub mod gate;
pub mod idp;
pub mod upstream;

#[allow(unused_imports)]
pub use gate::TestGate;
#[allow(unused_imports)]
pub use idp::TestIdp;
#[allow(unused_imports)]
pub use upstream::TestUpstream;
