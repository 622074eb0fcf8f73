//! Integration tests for configuration resolution.
//!
//! Exercises the public API end to end:
//! - file loading with includes from an includes directory
//! - precedence across default, file, variable and console sources
//! - derived keys (test fallbacks, port, resume, tb_scale)
//! - the fewshot-config binary

use fewshot_config::config::{
    ConfigMapping, ConfigValue, DefaultsSource, MergeStrategy, PortProbe, ResolveRequest,
    Resolver, ResolverOptions, Source, TcpProbe,
};
use fewshot_config::error::{ConfigError, ErrorCode};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, TcpListener};
use std::path::Path;
use tempfile::TempDir;

fn yaml(text: &str) -> ConfigMapping {
    serde_yaml::from_str(text).unwrap()
}

/// Lay out a project: `default.yaml`, and an includes directory `config/`.
fn project(defaults: &str) -> (TempDir, ResolverOptions) {
    let temp = TempDir::new().unwrap();
    let includes_dir = temp.path().join("config");
    fs::create_dir_all(includes_dir.join("headers")).unwrap();
    let defaults_path = temp.path().join("default.yaml");
    fs::write(&defaults_path, defaults).unwrap();

    let options = ResolverOptions::default()
        .with_defaults(DefaultsSource::File(defaults_path))
        .with_includes_dir(includes_dir);
    (temp, options)
}

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn never_busy(_port: u16) -> bool {
    false
}

const BASE_DEFAULTS: &str = r#"
way_num: 5
shot_num: 1
query_num: 15
test_way: ~
test_shot: ~
test_query: ~
train_episode: 1000
test_episode: 200
port: ~
optimizer:
  name: Adam
  kwargs:
    lr: 0.001
    weight_decay: 0.0005
"#;

mod include_tests {
    use super::*;

    #[test]
    fn own_keys_beat_includes_and_includes_fill_gaps() {
        let (temp, options) = project(BASE_DEFAULTS);
        write(&options.includes_dir, "inc.yaml", "a: 2\nb: 2\n");
        let file = write(temp.path(), "run.yaml", "a: 1\nincludes: [inc.yaml]\n");

        let resolver = Resolver::resolve_with_probe(
            &options,
            ResolveRequest::new().with_file(&file),
            never_busy,
        )
        .unwrap();

        assert_eq!(resolver.source(Source::File), &yaml("a: 1\nb: 2"));
        assert_eq!(resolver.get("a"), Some(&ConfigValue::from(1)));
        assert_eq!(resolver.get("b"), Some(&ConfigValue::from(2)));
        assert!(resolver.get("includes").is_none());
    }

    #[test]
    fn defaults_file_may_use_includes() {
        let (temp, _) = project("");
        let includes_dir = temp.path().join("config");
        write(&includes_dir, "headers/data.yaml", "image_size: 84\n");
        let defaults = write(
            temp.path(),
            "with_includes.yaml",
            "includes: [headers/data.yaml]\ntrain_episode: 10\ntest_episode: 5\n",
        );
        let options = ResolverOptions::default()
            .with_defaults(DefaultsSource::File(defaults))
            .with_includes_dir(includes_dir);

        let resolver =
            Resolver::resolve_with_probe(&options, ResolveRequest::new(), never_busy).unwrap();
        assert_eq!(resolver.get("image_size"), Some(&ConfigValue::from(84)));
        assert_eq!(resolver.get("tb_scale").and_then(|v| v.as_f64()), Some(2.0));
    }

    #[test]
    fn missing_include_aborts() {
        let (temp, options) = project(BASE_DEFAULTS);
        let file = write(temp.path(), "run.yaml", "includes: [headers/missing.yaml]\n");

        let err = Resolver::resolve_with_probe(
            &options,
            ResolveRequest::new().with_file(&file),
            never_busy,
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileNotFound);
    }

    #[test]
    fn missing_config_file_aborts() {
        let (temp, options) = project(BASE_DEFAULTS);
        let err = Resolver::resolve_with_probe(
            &options,
            ResolveRequest::new().with_file(temp.path().join("absent.yaml")),
            never_busy,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }
}

mod precedence_tests {
    use super::*;

    #[test]
    fn console_over_variable_over_file_over_default() {
        let (temp, options) = project("w: 1\ns: 1\ntrain_episode: 1\ntest_episode: 1\n");
        let file = write(temp.path(), "run.yaml", "w: 2\n");

        let resolver = Resolver::resolve_with_probe(
            &options,
            ResolveRequest::new()
                .with_file(&file)
                .with_variables(ConfigMapping::new())
                .with_console(yaml("w: 3")),
            never_busy,
        )
        .unwrap();

        assert_eq!(resolver.get("w"), Some(&ConfigValue::from(3)));
        assert_eq!(resolver.get("s"), Some(&ConfigValue::from(1)));
    }

    #[test]
    fn flat_merge_replaces_nested_optimizer() {
        let (temp, options) = project(BASE_DEFAULTS);
        let file = write(temp.path(), "run.yaml", "optimizer:\n  kwargs:\n    lr: 1e-5\n");

        let resolver = Resolver::resolve_with_probe(
            &options,
            ResolveRequest::new().with_file(&file),
            never_busy,
        )
        .unwrap();

        let optimizer = resolver.get("optimizer").unwrap();
        assert!(optimizer.get("name").is_none());
        assert_eq!(optimizer["kwargs"]["lr"].as_f64(), Some(1e-5));
    }

    #[test]
    fn recursive_merge_keeps_unspecified_fields() {
        let (temp, options) = project(BASE_DEFAULTS);
        let options = options.with_merge_strategy(MergeStrategy::Recursive);
        let file = write(temp.path(), "run.yaml", "optimizer:\n  kwargs:\n    lr: 1e-5\n");

        let resolver = Resolver::resolve_with_probe(
            &options,
            ResolveRequest::new().with_file(&file),
            never_busy,
        )
        .unwrap();

        let optimizer = resolver.get("optimizer").unwrap();
        assert_eq!(optimizer["name"].as_str(), Some("Adam"));
        assert_eq!(optimizer["kwargs"]["lr"].as_f64(), Some(1e-5));
        assert_eq!(optimizer["kwargs"]["weight_decay"].as_f64(), Some(0.0005));
    }
}

mod derivation_tests {
    use super::*;

    #[test]
    fn test_shape_falls_back_unless_set() {
        let (temp, options) = project(BASE_DEFAULTS);
        let file = write(temp.path(), "run.yaml", "test_shot: 5\n");

        let resolver = Resolver::resolve_with_probe(
            &options,
            ResolveRequest::new()
                .with_file(&file)
                .with_console(yaml("way_num: 10")),
            never_busy,
        )
        .unwrap();

        assert_eq!(resolver.get("test_way"), Some(&ConfigValue::from(10)));
        assert_eq!(resolver.get("test_shot"), Some(&ConfigValue::from(5)));
        assert_eq!(resolver.get("test_query"), Some(&ConfigValue::from(15)));
    }

    #[test]
    fn tb_scale_ratio_and_zero_denominator() {
        let (_temp, options) = project(BASE_DEFAULTS);
        let resolver =
            Resolver::resolve_with_probe(&options, ResolveRequest::new(), never_busy).unwrap();
        assert_eq!(resolver.get("tb_scale").and_then(|v| v.as_f64()), Some(5.0));

        let err = Resolver::resolve_with_probe(
            &options,
            ResolveRequest::new().with_console(yaml("test_episode: 0")),
            never_busy,
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DivisionByZero);
    }

    #[test]
    fn allocated_port_skips_listener() {
        let (_temp, options) = project(BASE_DEFAULTS);
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let taken = listener.local_addr().unwrap().port();

        // Every port below the listener's reads as busy, so the scan must pass it.
        let tcp = TcpProbe::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let probe = move |port: u16| port < taken || tcp.in_use(port);
        let resolver =
            Resolver::resolve_with_probe(&options, ResolveRequest::new(), probe).unwrap();

        let allocation = *resolver.port_allocation().unwrap();
        assert!(allocation.port > taken);
        assert_eq!(
            u32::from(allocation.port - allocation.start),
            allocation.collisions
        );
        assert_eq!(
            resolver.get("port"),
            Some(&ConfigValue::from(allocation.port))
        );
        drop(listener);
    }

    #[test]
    fn resume_path_from_saved_config() {
        let (temp, options) = project(BASE_DEFAULTS);
        let run_dir = temp.path().join("results/ProtoNet-5-1");
        let file = write(&run_dir, "config.yaml", "way_num: 5\n");

        let resolver = Resolver::resolve_with_probe(
            &options,
            ResolveRequest::new().with_file(&file).resuming(true),
            never_busy,
        )
        .unwrap();

        let expected = run_dir.to_string_lossy().into_owned();
        assert_eq!(resolver.get("resume"), Some(&ConfigValue::Bool(true)));
        assert_eq!(
            resolver.get("resume_path").and_then(|v| v.as_str()),
            Some(expected.as_str())
        );
    }

    #[test]
    fn unquoted_exponent_decodes_as_float() {
        let (temp, options) = project(BASE_DEFAULTS);
        let file = write(temp.path(), "run.yaml", "lr: 1e-5\nwarm: 1_000.5\n");

        let resolver = Resolver::resolve_with_probe(
            &options,
            ResolveRequest::new().with_file(&file),
            never_busy,
        )
        .unwrap();

        assert_eq!(resolver.get("lr").and_then(|v| v.as_f64()), Some(1e-5));
        assert_eq!(resolver.get("warm").and_then(|v| v.as_f64()), Some(1000.5));
    }

    #[test]
    fn quoted_float_forms_stay_strings() {
        let (temp, options) = project(BASE_DEFAULTS);
        let file = write(temp.path(), "run.yaml", "tag: \"1.0\"\nlr: '1e-5'\n");

        let resolver = Resolver::resolve_with_probe(
            &options,
            ResolveRequest::new().with_file(&file),
            never_busy,
        )
        .unwrap();

        assert_eq!(resolver.get("tag").and_then(|v| v.as_str()), Some("1.0"));
        assert_eq!(resolver.get("lr").and_then(|v| v.as_str()), Some("1e-5"));
    }
}

mod binary_tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn prints_effective_config_as_json() {
        let (temp, options) = project(BASE_DEFAULTS);
        let DefaultsSource::File(defaults) = &options.defaults else {
            unreachable!()
        };
        let file = write(temp.path(), "run.yaml", "port: 31000\n");

        let output = Command::new(env!("CARGO_BIN_EXE_fewshot-config"))
            .arg("--defaults")
            .arg(defaults)
            .arg("--includes-dir")
            .arg(&options.includes_dir)
            .arg("--config")
            .arg(&file)
            .args(["--format", "json", "-w", "20"])
            .output()
            .unwrap();
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(value["way_num"], 20);
        assert_eq!(value["test_way"], 20);
        assert_eq!(value["port"], 31000);
        assert_eq!(value["resume"], false);
        assert_eq!(value["tb_scale"], 5.0);
    }

    #[test]
    fn fails_on_zero_test_episode() {
        let (_temp, options) = project(BASE_DEFAULTS);
        let DefaultsSource::File(defaults) = &options.defaults else {
            unreachable!()
        };

        let output = Command::new(env!("CARGO_BIN_EXE_fewshot-config"))
            .arg("--defaults")
            .arg(defaults)
            .args(["--test_episode", "0"])
            .output()
            .unwrap();
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("division by zero"));
    }
}
