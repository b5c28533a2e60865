// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

pub mod balancer;
pub mod cache;
pub mod cli;
pub mod config;
pub mod exception;
pub mod handler;
pub mod logger;
pub mod param;
pub mod request;
pub mod resolver;
pub mod response;
pub mod server;
pub mod util;

pub use balancer::{Backend, RoundRobin};
pub use cache::{CacheOutcome, CacheStore, MemcachedStore, MemoryStore, ReadThroughCache};
pub use cli::Cli;
pub use config::{CacheBackend, Config};
pub use exception::Exception;
pub use handler::{ConnectionHandler, FileServer, Redirector};
pub use param::HttpRequestMethod;
pub use request::Request;
pub use resolver::{PathResolver, ResolveMode};
pub use response::Response;
pub use server::{listen_address, Acceptor, WorkerPool};
pub use util::HtmlBuilder;
