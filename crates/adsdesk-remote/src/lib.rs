// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod client;
mod mutations;
pub mod oauth;
pub mod persona;
mod session;
pub mod storage;

pub use client::Client;
pub use mutations::{FunctionNames, MutationError, Mutations, TableMutations};
pub use session::EditSession;
