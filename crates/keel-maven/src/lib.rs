//! Maven repository protocol as Keel needs it: reading POMs from
//! Maven-layout directories, writing POMs and checksum sidecars, and
//! publishing artifacts to directory and HTTP repositories.

pub mod auth;
pub mod checksum;
pub mod pom;
pub mod publish;
pub mod repository;
pub mod transport;
