//! Integration tests for the modules manager lifecycle
//!
//! Uses a configurable recording module that logs every lifecycle call into a
//! shared log, so ordering and isolation can be asserted from the outside.

use anyhow::{Result, bail};
use clap::Command;
use modman::builtin::{PROJECT_NAME_VAR, ProjectModule, WORKDIR_VAR, WorkfilesModule};
use modman::{
    CommandGroup, ConfigRoot, EnabledModules, EnvironmentContribution, Module, ModuleConfig,
    ModuleContext, ModuleDescriptor, ModuleError, ModuleRegistry, ModulesManager,
};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type EventLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone, Default)]
struct Behavior {
    fail_init: bool,
    panic_init: bool,
    fail_connect: bool,
    panic_connect: bool,
    env: Vec<(&'static str, &'static str)>,
    commands: Vec<&'static str>,
}

struct Recorder {
    name: String,
    behavior: Behavior,
    log: EventLog,
    seen_on_connect: Vec<String>,
}

impl Recorder {
    fn record(&self, event: &str) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{event}:{}", self.name));
    }
}

impl Module for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _ctx: &ModuleContext, _config: &ModuleConfig) -> Result<()> {
        self.record("init");
        if self.behavior.panic_init {
            panic!("boom in initialize");
        }
        if self.behavior.fail_init {
            bail!("told to fail initialization");
        }
        Ok(())
    }

    fn connect_with_modules(&mut self, modules: &EnabledModules<'_>) -> Result<()> {
        self.record("connect");
        self.seen_on_connect = modules.names().into_iter().map(String::from).collect();
        if self.behavior.panic_connect {
            panic!("boom in connect");
        }
        if self.behavior.fail_connect {
            bail!("told to fail connection");
        }
        Ok(())
    }

    fn get_global_environments(&self) -> EnvironmentContribution {
        self.behavior
            .env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn cli(&self, group: &mut CommandGroup) {
        for command in &self.behavior.commands {
            group.add_command(Command::new(*command), |_| Ok(()));
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.record("drop");
    }
}

fn recording(name: &'static str, behavior: Behavior, log: &EventLog) -> ModuleDescriptor {
    let log = Arc::clone(log);
    ModuleDescriptor::new(name, move || {
        Box::new(Recorder {
            name: name.to_string(),
            behavior: behavior.clone(),
            log: Arc::clone(&log),
            seen_on_connect: Vec::new(),
        })
    })
}

fn enabled(names: &[&str]) -> ConfigRoot {
    let mut modules = Map::new();
    for name in names {
        modules.insert(name.to_string(), json!({"enabled": true}));
    }
    ConfigRoot::new(Value::Object(modules)).unwrap()
}

fn events(log: &EventLog, kind: &str) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|e| e.starts_with(kind))
        .cloned()
        .collect()
}

#[test]
fn test_disabled_module_is_invisible() {
    let log = EventLog::default();
    let registry = ModuleRegistry::new()
        .with(recording(
            "on",
            Behavior {
                env: vec![("ON", "1")],
                commands: vec!["run"],
                ..Default::default()
            },
            &log,
        ))
        .with(recording(
            "off",
            Behavior {
                env: vec![("OFF", "1")],
                commands: vec!["run"],
                ..Default::default()
            },
            &log,
        ));
    let config = ConfigRoot::new(json!({
        "on": {"enabled": true},
        "off": {"enabled": false}
    }))
    .unwrap();

    let manager = ModulesManager::from_registry(&registry, &config).unwrap();

    assert!(matches!(
        manager.get_module("off"),
        Err(ModuleError::NotFound { .. })
    ));
    assert_eq!(manager.collect_global_environments().get("OFF"), None);
    assert_eq!(manager.collect_global_environments().get("ON"), Some("1"));
    assert_eq!(manager.build_command_tree().group_names(), vec!["on"]);
    assert_eq!(events(&log, "init"), vec!["init:on"]);
}

#[test]
fn test_duplicate_names_instantiate_nothing() {
    let constructed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&constructed);
    let factory = move || -> Box<dyn Module> {
        counter.fetch_add(1, Ordering::SeqCst);
        Box::new(ProjectModule::default())
    };

    let registry = ModuleRegistry::new()
        .with(ModuleDescriptor::new("project", factory.clone()))
        .with(ModuleDescriptor::new("project", factory));

    let result = ModulesManager::from_registry(&registry, &enabled(&["project"]));

    assert!(matches!(result, Err(ModuleError::DuplicateModule { .. })));
    assert_eq!(constructed.load(Ordering::SeqCst), 0);
}

#[test]
fn test_initialize_rejects_duplicate_descriptors() {
    let log = EventLog::default();
    let descriptors = vec![
        recording("a", Behavior::default(), &log),
        recording("a", Behavior::default(), &log),
    ];

    let result = ModulesManager::initialize(descriptors, &enabled(&["a"]));

    assert!(matches!(result, Err(ModuleError::DuplicateModule { .. })));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_initialize_rejects_invalid_names() {
    let log = EventLog::default();
    let descriptors = vec![
        recording("ok", Behavior::default(), &log),
        recording("", Behavior::default(), &log),
    ];
    let config = ConfigRoot::new(json!({"ok": {"enabled": true}, "": {"enabled": true}})).unwrap();

    let result = ModulesManager::initialize(descriptors, &config);

    match result {
        Err(ModuleError::InvalidModuleName { name }) => assert_eq!(name, ""),
        Err(other) => panic!("Expected InvalidModuleName, got {other:?}"),
        Ok(_) => panic!("Expected InvalidModuleName, got a manager"),
    }
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_panicking_module_is_isolated() {
    let log = EventLog::default();
    let registry = ModuleRegistry::new()
        .with(recording(
            "a",
            Behavior {
                panic_init: true,
                ..Default::default()
            },
            &log,
        ))
        .with(recording("b", Behavior::default(), &log));

    let manager = ModulesManager::from_registry(&registry, &enabled(&["a", "b"])).unwrap();

    let active: Vec<_> = manager.modules().iter().map(|m| m.name()).collect();
    assert_eq!(active, vec!["b"]);
    let report = manager.report();
    assert_eq!(report[0].status, "failed to initialize");
    assert!(
        report[0]
            .error
            .as_deref()
            .unwrap()
            .contains("module panicked: boom in initialize")
    );
}

#[test]
fn test_panic_during_connect_is_isolated() {
    let log = EventLog::default();
    let registry = ModuleRegistry::new()
        .with(recording(
            "a",
            Behavior {
                panic_connect: true,
                env: vec![("A", "1")],
                ..Default::default()
            },
            &log,
        ))
        .with(recording("b", Behavior::default(), &log));

    let manager = ModulesManager::from_registry(&registry, &enabled(&["a", "b"])).unwrap();

    assert_eq!(events(&log, "connect"), vec!["connect:a", "connect:b"]);
    let report = manager.report();
    assert_eq!(report[0].status, "failed to connect");
    assert!(report[0].error.as_deref().unwrap().contains("boom in connect"));
    assert!(report[1].connected);
    assert_eq!(manager.collect_global_environments().get("A"), Some("1"));
}

#[test]
fn test_initialization_failure_is_isolated() {
    let log = EventLog::default();
    let registry = ModuleRegistry::new()
        .with(recording(
            "a",
            Behavior {
                fail_init: true,
                ..Default::default()
            },
            &log,
        ))
        .with(recording("b", Behavior::default(), &log))
        .with(recording("c", Behavior::default(), &log));

    let manager = ModulesManager::from_registry(&registry, &enabled(&["a", "b", "c"])).unwrap();

    let active: Vec<_> = manager.modules().iter().map(|m| m.name()).collect();
    assert_eq!(active, vec!["b", "c"]);
    assert!(manager.get_module("a").is_err());

    let report = manager.report();
    assert_eq!(report.len(), 3);
    assert_eq!(report[0].name, "a");
    assert!(!report[0].active);
    assert!(
        report[0]
            .error
            .as_deref()
            .unwrap()
            .contains("told to fail initialization")
    );
    assert!(report[1].connected && report[2].connected);
}

#[test]
fn test_connect_sees_exactly_the_initialized_siblings() {
    let log = EventLog::default();
    let registry = ModuleRegistry::new()
        .with(recording("a", Behavior::default(), &log))
        .with(recording(
            "b",
            Behavior {
                fail_init: true,
                ..Default::default()
            },
            &log,
        ))
        .with(recording("c", Behavior::default(), &log))
        .with(recording("d", Behavior::default(), &log));

    let manager =
        ModulesManager::from_registry(&registry, &enabled(&["a", "b", "c", "d"])).unwrap();

    let seen = |name: &str| manager.get_module_as::<Recorder>(name).unwrap().seen_on_connect.clone();
    assert_eq!(seen("a"), vec!["c", "d"]);
    assert_eq!(seen("c"), vec!["a", "d"]);
    assert_eq!(seen("d"), vec!["a", "c"]);

    // Every initialize happened before the first connect
    let all = log.lock().unwrap().clone();
    let last_init = all.iter().rposition(|e| e.starts_with("init:")).unwrap();
    let first_connect = all.iter().position(|e| e.starts_with("connect:")).unwrap();
    assert!(last_init < first_connect);
    assert_eq!(events(&log, "connect"), vec!["connect:a", "connect:c", "connect:d"]);
}

#[test]
fn test_later_module_overrides_environment() {
    let log = EventLog::default();
    let registry = ModuleRegistry::new()
        .with(recording(
            "a",
            Behavior {
                env: vec![("X", "1"), ("ONLY_A", "a")],
                ..Default::default()
            },
            &log,
        ))
        .with(recording(
            "b",
            Behavior {
                env: vec![("X", "2")],
                ..Default::default()
            },
            &log,
        ));

    let manager = ModulesManager::from_registry(&registry, &enabled(&["a", "b"])).unwrap();
    let env = manager.collect_global_environments();

    assert_eq!(env.get("X"), Some("2"));
    assert_eq!(env.origin("X"), Some("b"));
    assert_eq!(env.get("ONLY_A"), Some("a"));
}

#[test]
fn test_lazy_id_is_stable_and_unique() {
    let log = EventLog::default();
    let registry = ModuleRegistry::new()
        .with(recording("a", Behavior::default(), &log))
        .with(recording("b", Behavior::default(), &log));
    let manager = ModulesManager::from_registry(&registry, &enabled(&["a", "b"])).unwrap();

    let a = manager.get_module("a").unwrap();
    let b = manager.get_module("b").unwrap();

    assert_eq!(a.id(), a.id());
    assert_ne!(a.id(), b.id());
    assert!(a.enabled());
}

#[test]
fn test_command_groups_follow_contributions() {
    let log = EventLog::default();
    let registry = ModuleRegistry::new()
        .with(recording("quiet", Behavior::default(), &log))
        .with(recording(
            "loud",
            Behavior {
                commands: vec!["shout"],
                ..Default::default()
            },
            &log,
        ));
    let manager = ModulesManager::from_registry(&registry, &enabled(&["quiet", "loud"])).unwrap();

    let tree = manager.build_command_tree();
    assert_eq!(tree.group_names(), vec!["loud"]);
    assert_eq!(tree.group("loud").unwrap().command_names(), vec!["shout"]);
    assert!(tree.group("quiet").is_none());

    let matches = tree
        .attach(Command::new("module"))
        .try_get_matches_from(["module", "loud", "shout"])
        .unwrap();
    tree.dispatch(&matches).unwrap();
}

#[test]
fn test_aggregation_is_repeatable() {
    let log = EventLog::default();
    let registry = ModuleRegistry::new()
        .with(recording(
            "a",
            Behavior {
                env: vec![("A", "1")],
                commands: vec!["one", "two"],
                ..Default::default()
            },
            &log,
        ))
        .with(recording(
            "b",
            Behavior {
                env: vec![("B", "2")],
                commands: vec!["three"],
                ..Default::default()
            },
            &log,
        ));
    let manager = ModulesManager::from_registry(&registry, &enabled(&["a", "b"])).unwrap();

    let first_env = manager.collect_global_environments().clone();
    let second_env = manager.collect_global_environments().clone();
    assert_eq!(first_env, second_env);

    let shape = |tree: &modman::CommandTree| -> Vec<(String, Vec<String>)> {
        tree.groups()
            .iter()
            .map(|g| {
                (
                    g.name().to_string(),
                    g.command_names().into_iter().map(String::from).collect(),
                )
            })
            .collect()
    };
    assert_eq!(
        shape(&manager.build_command_tree()),
        shape(&manager.build_command_tree())
    );
}

#[test]
fn test_connection_failure_keeps_module_aggregated() {
    let log = EventLog::default();
    let registry = ModuleRegistry::new().with(recording(
        "flaky",
        Behavior {
            fail_connect: true,
            env: vec![("FLAKY", "yes")],
            commands: vec!["retry"],
            ..Default::default()
        },
        &log,
    ));
    let manager = ModulesManager::from_registry(&registry, &enabled(&["flaky"])).unwrap();

    let instance = manager.get_module("flaky").unwrap();
    assert!(!instance.context().is_connected());
    assert!(manager.handle().is_active("flaky"));
    assert_eq!(manager.collect_global_environments().get("FLAKY"), Some("yes"));
    assert_eq!(manager.build_command_tree().group_names(), vec!["flaky"]);
    assert_eq!(manager.report()[0].status, "failed to connect");
}

#[test]
fn test_missing_requirement_only_fails_dependent() {
    let log = EventLog::default();
    let registry = ModuleRegistry::new()
        .with(recording("needs_sync", Behavior::default(), &log).requires(["sync"]))
        .with(recording("other", Behavior::default(), &log));

    let manager =
        ModulesManager::from_registry(&registry, &enabled(&["needs_sync", "other"])).unwrap();

    assert!(manager.get_module("needs_sync").is_err());
    assert!(manager.get_module("other").is_ok());
    assert!(
        manager.report()[0]
            .error
            .as_deref()
            .unwrap()
            .contains("requires `sync`")
    );
    // The dependent module was never constructed
    assert_eq!(events(&log, "init"), vec!["init:other"]);
}

#[test]
fn test_failed_requirement_fails_dependent() {
    let log = EventLog::default();
    let registry = ModuleRegistry::new()
        .with(recording("child", Behavior::default(), &log).requires(["parent"]))
        .with(recording(
            "parent",
            Behavior {
                fail_init: true,
                ..Default::default()
            },
            &log,
        ));

    let manager = ModulesManager::from_registry(&registry, &enabled(&["child", "parent"])).unwrap();

    assert!(manager.modules().is_empty());
    assert_eq!(events(&log, "init"), vec!["init:parent"]);
}

#[test]
fn test_name_mismatch_fails_initialization() {
    let registry = ModuleRegistry::new().with(ModuleDescriptor::new("renamed", || {
        Box::new(ProjectModule::default())
    }));
    let config = ConfigRoot::new(json!({"renamed": {"enabled": true, "name": "alpha"}})).unwrap();

    let manager = ModulesManager::from_registry(&registry, &config).unwrap();

    assert!(manager.modules().is_empty());
    assert!(
        manager.report()[0]
            .error
            .as_deref()
            .unwrap()
            .contains("reports name `project`")
    );
}

#[test]
fn test_modules_dropped_in_reverse_order() {
    let log = EventLog::default();
    let registry = ModuleRegistry::new()
        .with(recording("first", Behavior::default(), &log))
        .with(recording("second", Behavior::default(), &log))
        .with(recording("third", Behavior::default(), &log));
    let manager =
        ModulesManager::from_registry(&registry, &enabled(&["first", "second", "third"])).unwrap();
    let handle = manager.handle();
    assert!(handle.is_alive());
    assert_eq!(handle.active_modules(), vec!["first", "second", "third"]);

    drop(manager);

    assert_eq!(
        events(&log, "drop"),
        vec!["drop:third", "drop:second", "drop:first"]
    );
    assert!(!handle.is_alive());
    assert!(!handle.is_active("first"));
}

#[test]
fn test_managers_are_independent() {
    let registry = ModuleRegistry::builtin();
    let config = ConfigRoot::new(json!({"project": {"enabled": true, "name": "alpha"}})).unwrap();

    let first = ModulesManager::from_registry(&registry, &config).unwrap();
    let second = ModulesManager::from_registry(&registry, &config).unwrap();

    assert_ne!(first.id(), second.id());
    assert_ne!(
        first.get_module("project").unwrap().id(),
        second.get_module("project").unwrap().id()
    );
    assert_eq!(
        first.get_module("project").unwrap().context().manager().manager_id(),
        first.id()
    );
}

#[test]
fn test_builtin_modules_connect_through_project_root() {
    let config = ConfigRoot::from_yaml_str(
        r#"
workfiles:
  enabled: true
  extensions: ["TVPP", ".psd"]
project:
  enabled: true
  name: alpha
  root: /projects/alpha
"#,
    )
    .unwrap();

    let manager = ModulesManager::from_registry(&ModuleRegistry::builtin(), &config).unwrap();

    let workfiles = manager.get_module_as::<WorkfilesModule>("workfiles").unwrap();
    assert_eq!(workfiles.extensions(), [".tvpp", ".psd"]);
    assert_eq!(
        workfiles.workfile_path("layout", 2),
        Some(PathBuf::from("/projects/alpha/work/layout_v002.tvpp"))
    );

    let env = manager.collect_global_environments();
    assert_eq!(env.get(PROJECT_NAME_VAR), Some("alpha"));
    assert_eq!(env.get(WORKDIR_VAR), Some("/projects/alpha/work"));
    assert_eq!(
        manager.build_command_tree().group_names(),
        vec!["project", "workfiles"]
    );
}

#[test]
fn test_builtin_workfiles_without_project_is_isolated() {
    let config = ConfigRoot::new(json!({"workfiles": {"enabled": true}})).unwrap();
    let manager = ModulesManager::from_registry(&ModuleRegistry::builtin(), &config).unwrap();

    assert!(manager.modules().is_empty());
    assert!(matches!(
        manager.get_module("workfiles"),
        Err(ModuleError::NotFound { .. })
    ));
}
