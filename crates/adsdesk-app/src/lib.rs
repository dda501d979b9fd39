// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod backend;
pub mod editors;
pub mod forms;
pub mod history;
pub mod ids;
pub mod model;
pub mod selection;
pub mod shortcuts;
pub mod state;

pub use backend::*;
pub use editors::*;
pub use forms::*;
pub use history::*;
pub use ids::*;
pub use model::*;
pub use selection::*;
pub use shortcuts::*;
pub use state::*;
