#![allow(dead_code)]

use std::collections::VecDeque;

use jrk_core::{Controller, ControllerConfig, ControllerView, Presenter};
use jrk_hardware::{SimBackend, SimSpec};
use jrk_traits::Device;

/// Presenter that records everything and answers questions from a script.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub answers: VecDeque<bool>,
    pub default_answer: bool,
    pub questions: Vec<String>,
    pub errors: Vec<String>,
    pub infos: Vec<String>,
    pub renders: usize,
    pub last_view: Option<ControllerView>,
}

impl RecordingPresenter {
    pub fn answering(default_answer: bool) -> Self {
        Self {
            default_answer,
            ..Self::default()
        }
    }
}

impl Presenter for RecordingPresenter {
    fn confirm(&mut self, question: &str) -> bool {
        self.questions.push(question.to_string());
        self.answers.pop_front().unwrap_or(self.default_answer)
    }

    fn show_error_message(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn show_info_message(&mut self, message: &str) {
        self.infos.push(message.to_string());
    }

    fn render(&mut self, view: &ControllerView) {
        self.renders += 1;
        self.last_view = Some(view.clone());
    }
}

pub type SimController = Controller<SimBackend, RecordingPresenter>;

pub fn spec(serial: &str) -> SimSpec {
    SimSpec::new(Device::new(1, serial, format!("sim-{serial}")))
}

pub fn controller(sim: &SimBackend, answer: bool) -> SimController {
    Controller::new(
        sim.clone(),
        RecordingPresenter::answering(answer),
        ControllerConfig::default(),
    )
}

/// A controller that has auto-connected to the single unit on `sim`.
pub fn connected(sim: &SimBackend, answer: bool) -> SimController {
    let mut c = controller(sim, answer);
    c.start();
    c.update();
    assert!(c.connected(), "auto-connect failed: {:?}", c.presenter().errors);
    c
}

/// Runs updates until the next device list refresh has happened.
pub fn until_next_refresh(c: &mut SimController) {
    for _ in 0..c.config().device_list_divider {
        c.update();
    }
}
