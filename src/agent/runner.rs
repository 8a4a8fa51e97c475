//! Tool-dispatch loop for one user turn
//!
//! Drives the model/tool round-trips through an explicit state machine
//! instead of inferring control flow from message-content shapes. One call to
//! [`AgentLoop::run_turn`] handles everything between a user message and the
//! turn's final rendered output.

use std::collections::VecDeque;

use crate::chat::surface::ChatSurface;
use crate::common::prelude::*;
use crate::core::Segment;
use crate::llm::{ChatMessage, ChatModel, ModelTurn, ToolCall};
use crate::session::Session;
use crate::tools::ToolRegistry;

/// States of one user turn
#[derive(Debug)]
enum TurnState {
    /// Waiting for the model's next move
    AwaitModel,
    /// Picking the next pending tool call
    DispatchTool,
    /// Executing one tool call
    AwaitToolResult(ToolCall),
    /// Turn finished
    Done,
}

/// Runs user turns against a model and a tool registry
pub struct AgentLoop<'a> {
    model: &'a dyn ChatModel,
    registry: &'a ToolRegistry,
    /// Maximum model round-trips per turn
    max_iterations: usize,
}

impl<'a> AgentLoop<'a> {
    pub fn new(model: &'a dyn ChatModel, registry: &'a ToolRegistry, max_iterations: usize) -> Self {
        Self {
            model,
            registry,
            max_iterations,
        }
    }

    /// Drive one user turn to completion.
    ///
    /// The user message is already in the session transcript. Model errors
    /// propagate to the caller; tool faults never do (tools fold them into
    /// their result strings).
    pub async fn run_turn(
        &self,
        session: &mut Session,
        surface: &mut dyn ChatSurface,
    ) -> Result<()> {
        let specs = self.registry.specs();
        let mut pending: VecDeque<ToolCall> = VecDeque::new();
        let mut direct_output_emitted = false;
        let mut rounds = 0usize;
        let mut state = TurnState::AwaitModel;

        loop {
            state = match state {
                TurnState::AwaitModel => {
                    rounds += 1;
                    if rounds > self.max_iterations {
                        warn!(
                            "Turn exceeded {} model rounds, stopping",
                            self.max_iterations
                        );
                        surface.notice("Stopped after too many tool rounds.")?;
                        TurnState::Done
                    } else {
                        let turn = self.model.complete(session.transcript(), &specs).await?;
                        self.on_model_turn(turn, session, surface, &mut pending)?
                    }
                }

                TurnState::DispatchTool => match pending.pop_front() {
                    Some(call) => TurnState::AwaitToolResult(call),
                    // A direct tool's output already ended the turn; anything
                    // else goes back to the model.
                    None if direct_output_emitted => TurnState::Done,
                    None => TurnState::AwaitModel,
                },

                TurnState::AwaitToolResult(call) => {
                    let result = match self.registry.get(&call.name) {
                        Some(tool) => tool.execute(&call.arguments, session).await,
                        None => {
                            warn!("Model requested unknown tool: {}", call.name);
                            format!("Unknown tool: {}", call.name)
                        }
                    };
                    debug!(tool = %call.name, "Tool call finished");

                    if self.registry.is_direct(&call.name) {
                        surface.assistant_segment(&Segment::text(&result))?;
                        direct_output_emitted = true;
                    }
                    session.push_message(ChatMessage::tool_result(&call.id, result));
                    TurnState::DispatchTool
                }

                TurnState::Done => break,
            };
        }

        Ok(())
    }

    fn on_model_turn(
        &self,
        turn: ModelTurn,
        session: &mut Session,
        surface: &mut dyn ChatSurface,
        pending: &mut VecDeque<ToolCall>,
    ) -> Result<TurnState> {
        match turn {
            ModelTurn::Answer(text) => {
                if !text.is_empty() {
                    surface.assistant_segment(&Segment::text(&text))?;
                }
                session.push_message(ChatMessage::assistant(text));
                Ok(TurnState::Done)
            }
            ModelTurn::ToolCalls { text, calls } => {
                if let Some(text) = &text {
                    surface.assistant_segment(&Segment::text(text))?;
                }
                // Code arguments are shown before the tool runs, the way the
                // transcript reads in the chat surface.
                for call in &calls {
                    if let Some(code) = call.string_arg("code") {
                        surface.assistant_segment(&Segment::code(code_language(&call.name), code))?;
                    }
                }
                session.push_message(ChatMessage::assistant_tool_calls(text, calls.clone()));
                pending.extend(calls);
                Ok(TurnState::DispatchTool)
            }
        }
    }
}

/// Syntax tag for a tool's code argument
fn code_language(tool_name: &str) -> Option<&'static str> {
    match tool_name {
        "execute_python" => Some("python"),
        "render_react" => Some("tsx"),
        _ => None,
    }
}
