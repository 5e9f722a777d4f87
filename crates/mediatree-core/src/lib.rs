//! MediaTree Core - Domain types, ports and configuration
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `NodeKind`, `Privacy`, `RemoteEntry`, `RemotePath`, `PathPattern`
//! - **Port definitions** - Traits for adapters: `IRemoteClient`, `IIgnoreStore`,
//!   `IMediaProbe`, `IConfirmPrompt`
//! - **Configuration** - YAML-backed settings for the sync engine
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure data types with no I/O.
//! Ports define trait interfaces that the remote transport, the ignore-list
//! storage and the metadata extractor implement outside of the engine.

pub mod config;
pub mod domain;
pub mod ports;
