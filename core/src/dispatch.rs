//! Meta-command routing.
//!
//! Routing is a pure function of the session mode and the current line.
//! Load directives rewrite the line and routing resumes below the rule that
//! fired, so the precedence order is:
//!
//! | # | mode   | line                   | route            |
//! |---|--------|------------------------|------------------|
//! | 1 | Normal | `.help`                | `ShowHelp`       |
//! | 2 | Normal | `.monitor`             | `Monitor`        |
//! | 3 | Normal | `.unmonitor`           | `Unmonitor`      |
//! | 4 | any    | `.load-blueprint…`     | `ExpandBlueprint`|
//! | 5 | any    | `.load…`               | `ExpandFile`     |
//! | 6 | any    | `.editor`              | `EnterEditor`    |
//! | 7 | Editor | `.done`                | `SubmitEditor`   |
//! | 8 | Editor | `.cancel`              | `CancelEditor`   |
//! | 9 | Editor | anything else          | `BufferLine`     |
//! |10 | Normal | `.exit`                | `Exit`           |
//! |11 | Normal | anything else          | `Evaluate`       |

use std::sync::Arc;

use tracing::debug;

use crate::capability::DirectiveLoader;
use crate::capability::ProcessControl;
use crate::display::Display;
use crate::error::EvaluationError;
use crate::evaluate::Evaluator;
use crate::help::EDITOR_BANNER;
use crate::help::EXIT_NOTICE;
use crate::help::REPL_HELP;
use crate::session::Mode;
use crate::session::Session;

const BLUEPRINT_DIRECTIVE: &str = ".load-blueprint";
const LOAD_DIRECTIVE: &str = ".load";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ShowHelp,
    Monitor,
    Unmonitor,
    ExpandBlueprint,
    ExpandFile,
    EnterEditor,
    SubmitEditor,
    CancelEditor,
    BufferLine,
    Exit,
    Evaluate,
}

/// How far down the table a line has already travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// The line as typed.
    Typed,
    /// Produced by a blueprint expansion; rules 1–4 no longer apply.
    AfterBlueprint,
    /// Produced by a file expansion; rules 1–5 no longer apply.
    AfterLoad,
}

/// Classifies a line exactly as typed.
pub fn route(mode: Mode, line: &str) -> Route {
    route_from(Stage::Typed, mode, line)
}

pub fn route_from(stage: Stage, mode: Mode, line: &str) -> Route {
    if stage == Stage::Typed && mode == Mode::Normal {
        match line {
            ".help" => return Route::ShowHelp,
            ".monitor" => return Route::Monitor,
            ".unmonitor" => return Route::Unmonitor,
            _ => {}
        }
    }
    if stage == Stage::Typed && line.starts_with(BLUEPRINT_DIRECTIVE) {
        return Route::ExpandBlueprint;
    }
    if stage <= Stage::AfterBlueprint && line.starts_with(LOAD_DIRECTIVE) {
        return Route::ExpandFile;
    }
    if line == ".editor" {
        return Route::EnterEditor;
    }
    if mode == Mode::Editor {
        return match line {
            ".done" => Route::SubmitEditor,
            ".cancel" => Route::CancelEditor,
            _ => Route::BufferLine,
        };
    }
    if line == ".exit" {
        return Route::Exit;
    }
    Route::Evaluate
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Collaborators the dispatcher routes to.
#[derive(Clone)]
pub struct Dispatcher {
    display: Arc<dyn Display>,
    evaluator: Evaluator,
    control: Arc<dyn ProcessControl>,
    files: Arc<dyn DirectiveLoader>,
    blueprints: Arc<dyn DirectiveLoader>,
}

impl Dispatcher {
    pub fn new(
        display: Arc<dyn Display>,
        evaluator: Evaluator,
        control: Arc<dyn ProcessControl>,
        files: Arc<dyn DirectiveLoader>,
        blueprints: Arc<dyn DirectiveLoader>,
    ) -> Self {
        Self {
            display,
            evaluator,
            control,
            files,
            blueprints,
        }
    }

    pub fn display(&self) -> &Arc<dyn Display> {
        &self.display
    }

    pub async fn dispatch(&self, session: &mut Session, typed: &str) -> Flow {
        if session.is_terminated() {
            return Flow::Exit;
        }

        let mut line = typed.to_string();
        let mut stage = Stage::Typed;
        loop {
            let route = route_from(stage, session.mode(), &line);
            debug!(?route, ?stage, mode = ?session.mode(), "routing input");
            match route {
                Route::ShowHelp => {
                    self.display.notice(REPL_HELP);
                    return Flow::Continue;
                }
                Route::Monitor => {
                    let outcome = self
                        .control
                        .monitor(session.credential(), session.process_id())
                        .await;
                    self.show_control(outcome);
                    return Flow::Continue;
                }
                Route::Unmonitor => {
                    let outcome = self
                        .control
                        .unmonitor(session.credential(), session.process_id())
                        .await;
                    self.show_control(outcome);
                    return Flow::Continue;
                }
                Route::ExpandBlueprint => match self.blueprints.expand(&line) {
                    Ok(code) => {
                        line = code;
                        stage = Stage::AfterBlueprint;
                    }
                    Err(err) => {
                        self.display.error(err.message());
                        return Flow::Continue;
                    }
                },
                Route::ExpandFile => match self.files.expand(&line) {
                    Ok(code) => {
                        line = code;
                        stage = Stage::AfterLoad;
                    }
                    Err(err) => {
                        self.display.error(err.message());
                        return Flow::Continue;
                    }
                },
                Route::EnterEditor => {
                    session.monitor_mut().suspend();
                    session.enter_editor();
                    self.display.notice(EDITOR_BANNER);
                    return Flow::Continue;
                }
                Route::SubmitEditor => {
                    let submission = session.take_editor_buffer();
                    return self.evaluate(session, &submission).await;
                }
                Route::CancelEditor => {
                    session.take_editor_buffer();
                    session.monitor_mut().resume();
                    return Flow::Continue;
                }
                Route::BufferLine => {
                    session.buffer_line(&line);
                    return Flow::Continue;
                }
                Route::Exit => {
                    self.shutdown(session);
                    return Flow::Exit;
                }
                Route::Evaluate => return self.evaluate(session, &line).await,
            }
        }
    }

    /// Stops the live feed for good and ends the session.
    pub fn shutdown(&self, session: &mut Session) {
        session.monitor_mut().shutdown();
        self.display.notice(EXIT_NOTICE);
        session.terminate();
    }

    async fn evaluate(&self, session: &mut Session, submission: &str) -> Flow {
        let result = self.evaluator.evaluate(submission, session).await;
        result.show(self.display.as_ref());
        session.set_prompt(result.next_prompt);
        Flow::Continue
    }

    fn show_control(&self, outcome: Result<String, EvaluationError>) {
        match outcome {
            Ok(text) => self.display.output(&text),
            Err(err) => self.display.error(&err.to_string()),
        }
    }
}
