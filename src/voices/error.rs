// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use crate::{
    config::ConfigError,
    graph::{GraphError, GraphState},
};

/// Errors surfaced by the voice engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Audio graph is still {state} after {attempts} resume attempts")]
    ContextNotRunning { state: GraphState, attempts: u32 },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Cannot play an empty buffer")]
    EmptyBuffer,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
