//! Test support: fixture files and stubbed responses.
//!
//! Services registered with the `test` adapter never touch the network.
//! Every call is recorded, and answers come from responses registered
//! through [`GraphQLStubs`]:
//!
//! - a stub with exact arguments beats a wildcard stub
//! - among equally specific stubs the first registered wins
//! - unstubbed calls get `{"data": {}, "errors": []}`
//!
//! Fixture files live under the configured fixture root, one file per
//! operation (`<root>/<service>/<operation>.yml` or `.json`), and are read
//! once per [`FixtureLibrary`].

mod fixtures;
mod stub;

pub use fixtures::{FixtureLibrary, FixtureSet};
pub use stub::{GraphQLStubs, StubBuilder};
