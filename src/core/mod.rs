// ─── modsync Core ───
// Identifies local mod archives and matches them to catalog releases for a
// target game version.
//
// Architecture:
//   core/
//     identity/    Descriptor reader, filename heuristics, library analysis
//     catalog/     Catalog trait, Modrinth client, resolver, release matcher
//     batch/       Update plans + sequential, cancellable orchestrator
//     downloader/  Download trigger + streaming file writer
//     state/       Persisted settings
//     http         Shared HTTP client
//     error        Crate-wide error type

pub mod batch;
pub mod catalog;
pub mod downloader;
pub mod error;
pub mod http;
pub mod identity;
pub mod state;

#[cfg(test)]
mod test_support;
