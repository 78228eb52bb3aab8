//! Generated gRPC protocol types for rota.
//!
//! The wire contract lives in `proto/rota.proto`; this crate only exposes the
//! tonic/prost generated code so servers and clients share one definition.

tonic::include_proto!("rota");
