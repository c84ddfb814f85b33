//! Agents: an LLM client bound to an instruction, and ways to combine several

#[allow(clippy::module_inception)]
mod agent;
mod group;
mod index;
mod legion;
pub mod template;

pub use agent::{Agent, AgentInput};
pub use group::AgentGroup;
pub use index::AgentIndex;
pub use legion::AgentLegion;
