//! Mock scenarios.
//!
//! A scenario is a banner plus canned replies, turned into a ready
//! [`MockTransport`].

use super::transport::MockTransport;
use crate::config::DEFAULT_PROMPT;

/// One canned exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioStep {
    /// Input that triggers the response.
    pub expect: String,
    /// Output queued when the trigger is written.
    pub response: String,
}

impl ScenarioStep {
    /// Create a new scenario step.
    #[must_use]
    pub fn new(expect: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            expect: expect.into(),
            response: response.into(),
        }
    }
}

/// A complete mock scenario.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    /// Name of the scenario.
    name: String,
    /// Output when the shell opens.
    banner: Option<String>,
    /// Canned replies.
    steps: Vec<ScenarioStep>,
    /// Echo input like a PTY.
    echo: bool,
}

impl Scenario {
    /// Create a new scenario.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// A Slicify node: login banner ending in the default prompt, PTY echo,
    /// and replies for a few common commands.
    #[must_use]
    pub fn slicify_node() -> Self {
        let prompt = format!("{DEFAULT_PROMPT}$ ");
        Self::new("slicify-node")
            .banner(format!(
                "Welcome to Ubuntu 14.04 LTS (GNU/Linux 3.13.0-24-generic x86_64)\r\n\r\n{prompt}"
            ))
            .echo(true)
            .expect_respond("pwd", format!("/home/slicify\r\n{prompt}"))
            .expect_respond("whoami", format!("slicify\r\n{prompt}"))
            .expect_respond("nproc", format!("8\r\n{prompt}"))
    }

    /// Set the banner.
    #[must_use]
    pub fn banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = Some(banner.into());
        self
    }

    /// Echo written input.
    #[must_use]
    pub const fn echo(mut self, enabled: bool) -> Self {
        self.echo = enabled;
        self
    }

    /// Add a step to the scenario.
    #[must_use]
    pub fn step(mut self, step: ScenarioStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Add an expect-respond pair.
    #[must_use]
    pub fn expect_respond(self, expect: impl Into<String>, response: impl Into<String>) -> Self {
        self.step(ScenarioStep::new(expect, response))
    }

    /// Get the scenario name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the steps.
    #[must_use]
    pub fn steps(&self) -> &[ScenarioStep] {
        &self.steps
    }

    /// Build a transport playing this scenario.
    #[must_use]
    pub fn to_transport(&self) -> MockTransport {
        let mut transport = MockTransport::new().with_echo(self.echo);
        if let Some(banner) = &self.banner {
            transport = transport.with_banner(banner);
        }
        for step in &self.steps {
            transport = transport.respond(&step.expect, &step.response);
        }
        transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_basic() {
        let scenario = Scenario::new("test")
            .banner("Welcome\n$ ")
            .expect_respond("ls", "a b\n$ ")
            .expect_respond("id", "uid=0\n$ ");

        assert_eq!(scenario.name(), "test");
        assert_eq!(scenario.steps().len(), 2);
        assert_eq!(scenario.steps()[0], ScenarioStep::new("ls", "a b\n$ "));
    }

    #[test]
    fn slicify_node_greets_with_prompt() {
        let scenario = Scenario::slicify_node();
        assert!(scenario.banner.as_deref().unwrap().contains(DEFAULT_PROMPT));
        assert_eq!(scenario.to_transport().pending_output(), 0);
    }
}
