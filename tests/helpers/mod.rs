#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use grovr::backend::{Api, Backend, BackendError, BackendResult};
use grovr::config::{Config, ConfigFile};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Build a Config rooted in the temp dir.
pub fn test_config(tmp: &TempDir) -> Config {
    Config::new(tmp.path().join(".grovr"), ConfigFile::default())
}

struct Rule {
    command: String,
    /// Only applies when this argument has this value.
    arg: Option<(String, Value)>,
    outcome: Result<Value, String>,
}

/// In-memory backend with scripted responses and a call log.
///
/// Rules added later win over earlier ones. Commands without a rule answer
/// `null`, which decodes as `()` or `None`.
#[derive(Default)]
pub struct FakeBackend {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, command: &str, result: Value) {
        self.push(command, None, Ok(result));
    }

    pub fn respond_when(&self, command: &str, arg: &str, value: impl Into<Value>, result: Value) {
        self.push(command, Some((arg.to_string(), value.into())), Ok(result));
    }

    pub fn fail(&self, command: &str, message: &str) {
        self.push(command, None, Err(message.to_string()));
    }

    pub fn fail_when(&self, command: &str, arg: &str, value: impl Into<Value>, message: &str) {
        self.push(
            command,
            Some((arg.to_string(), value.into())),
            Err(message.to_string()),
        );
    }

    fn push(&self, command: &str, arg: Option<(String, Value)>, outcome: Result<Value, String>) {
        self.rules.lock().unwrap().push(Rule {
            command: command.to_string(),
            arg,
            outcome,
        });
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    /// Argument objects of every call to `command`, in call order.
    pub fn calls_to(&self, command: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(c, _)| c == command)
            .map(|(_, args)| args)
            .collect()
    }

    pub fn command_names(&self) -> Vec<String> {
        self.calls().into_iter().map(|(c, _)| c).collect()
    }

    pub fn was_called(&self, command: &str) -> bool {
        self.calls().iter().any(|(c, _)| c == command)
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn invoke(&self, command: &str, args: Value) -> BackendResult<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), args.clone()));

        let rules = self.rules.lock().unwrap();
        let rule = rules.iter().rev().find(|rule| {
            rule.command == command
                && rule
                    .arg
                    .as_ref()
                    .map_or(true, |(key, value)| args.get(key) == Some(value))
        });
        match rule.map(|r| r.outcome.clone()) {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(BackendError::Command {
                command: command.to_string(),
                message,
            }),
            None => Ok(Value::Null),
        }
    }
}

pub fn api_for(backend: &Arc<FakeBackend>) -> Api {
    Api::new(Arc::clone(backend) as Arc<dyn Backend>)
}

// ---------------------------------------------------------------------------
// JSON fixtures in the backend's wire shape
// ---------------------------------------------------------------------------

pub fn project_json(name: &str, repo_path: &str) -> Value {
    json!({ "name": name, "repo_path": repo_path })
}

pub fn worktree_json(path: &str, branch: &str, is_main: bool) -> Value {
    json!({ "path": path, "branch": branch, "is_main": is_main })
}

pub fn memo_json(description: &str, issue: &str) -> Value {
    json!({ "description": description, "issue_number": issue })
}

pub fn pr_json(number: u64, state: &str) -> Value {
    json!({
        "number": number,
        "title": format!("PR {}", number),
        "state": state,
        "url": format!("https://github.com/acme/web/pull/{}", number),
    })
}

pub fn issue_json(key: &str, category: &str) -> Value {
    json!({
        "key": key,
        "summary": "Fix login",
        "status": "In Progress",
        "status_category": category,
        "url": format!("https://acme.atlassian.net/browse/{}", key),
    })
}
