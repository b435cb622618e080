//! Structural tests for architectural boundary enforcement.
//!
//! These tests scan source files to verify that the layer boundaries
//! (domain → application → infra/commands/output) stay intact.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Read a file and strip comment lines to avoid false positives.
fn read_non_comment_lines(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|l| {
            let trimmed = l.trim();
            !trimmed.starts_with("//") && !trimmed.starts_with("/*") && !trimmed.starts_with('*')
        })
        .map(String::from)
        .collect()
}

/// Track brace depth and return whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    /// Process a line and return `true` if it's inside a `#[cfg(test)]` block.
    fn process_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

fn src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

fn relative(file: &Path) -> String {
    file.strip_prefix(env!("CARGO_MANIFEST_DIR"))
        .unwrap_or(file)
        .display()
        .to_string()
}

/// Non-test lines of every file under `dir` that contain any of `needles`.
fn scan(dir: &Path, needles: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for file in collect_rs_files(dir) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            if in_test || trimmed.starts_with("//") {
                continue;
            }
            for needle in needles {
                if line.contains(needle) {
                    violations.push(format!("{}:{}: `{needle}`: {line}", relative(&file), i + 1));
                }
            }
        }
    }
    violations
}

// ── Layer purity ─────────────────────────────────────────────────────────────

#[test]
fn domain_is_free_of_io_and_outer_layers() {
    let violations = scan(
        &src_dir().join("domain"),
        &[
            "crate::infra",
            "crate::application",
            "crate::commands",
            "crate::output",
            "tokio::",
            "std::fs",
            "std::process",
            "std::net::Tcp",
        ],
    );
    assert!(
        violations.is_empty(),
        "domain/ must stay pure:\n{}",
        violations.join("\n")
    );
}

#[test]
fn services_depend_only_on_domain_and_ports() {
    let violations = scan(
        &src_dir().join("application"),
        &["crate::infra", "crate::commands", "crate::output", "crate::app::"],
    );
    assert!(
        violations.is_empty(),
        "application/ must not import infra/, commands/, or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&src_dir().join("infra")) {
        let lines = read_non_comment_lines(&file);
        for (i, line) in lines.iter().enumerate() {
            if line.contains("crate::commands") || line.contains("crate::output") {
                violations.push(format!(
                    "{}:{}: forbidden import in infra/: {line}",
                    relative(&file),
                    i + 1
                ));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        violations.join("\n")
    );
}

#[test]
fn infra_has_no_print_macros_outside_tests() {
    let violations = scan(&src_dir().join("infra"), &["println!", "eprintln!"]);
    assert!(
        violations.is_empty(),
        "infra/ must not use println!/eprintln! outside #[cfg(test)]:\n{}",
        violations.join("\n")
    );
}

#[test]
fn services_log_through_tracing_not_print_macros() {
    let violations = scan(
        &src_dir().join("application"),
        &["println!", "eprintln!", "print!(", "eprint!("],
    );
    assert!(
        violations.is_empty(),
        "application/ must report through ProgressReporter or tracing:\n{}",
        violations.join("\n")
    );
}

// ── Runtime access ───────────────────────────────────────────────────────────

#[test]
fn no_tokio_command_runner_new_outside_infra() {
    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&src_dir()) {
        let rel = relative(&file).replace('\\', "/");
        if rel.contains("/infra/") || rel.ends_with("app.rs") {
            continue;
        }
        let lines = read_non_comment_lines(&file);
        for (i, line) in lines.iter().enumerate() {
            if line.contains("TokioCommandRunner::new") {
                violations.push(format!(
                    "{rel}:{}: TokioCommandRunner::new outside infra/: {line}",
                    i + 1
                ));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Found TokioCommandRunner::new outside infra/ — runtime calls must go through port traits:\n{}",
        violations.join("\n")
    );
}

#[test]
fn no_concrete_adapters_in_service_signatures() {
    let concrete_types = [
        "DockerRuntime<",
        "TokioCommandRunner>",
        "KnownHostsStore",
        "SshKeygen<",
        "BannerProbe",
    ];

    let mut violations: Vec<String> = Vec::new();
    for file in collect_rs_files(&src_dir().join("application").join("services")) {
        let lines = read_non_comment_lines(&file);
        for (i, line) in lines.iter().enumerate() {
            if !line.contains("fn ") {
                continue;
            }
            for concrete in &concrete_types {
                if line.contains(concrete) {
                    violations.push(format!(
                        "{}:{}: concrete type `{concrete}` in function signature: {line}",
                        relative(&file),
                        i + 1
                    ));
                }
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Found concrete adapter types in service signatures — use trait bounds instead:\n{}",
        violations.join("\n")
    );
}

#[test]
fn docker_is_only_invoked_from_the_docker_adapter() {
    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&src_dir()) {
        let rel = relative(&file).replace('\\', "/");
        if rel.ends_with("infra/docker.rs") {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            if tracker.process_line(line) {
                continue;
            }
            if line.contains("\"docker\"") {
                violations.push(format!("{rel}:{}: {line}", i + 1));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "only infra/docker.rs may spawn the docker binary:\n{}",
        violations.join("\n")
    );
}

// ── Commands ─────────────────────────────────────────────────────────────────

#[test]
fn no_inline_json_branching_in_commands() {
    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&src_dir().join("commands")) {
        let lines = read_non_comment_lines(&file);
        for (i, line) in lines.iter().enumerate() {
            if line.contains("json: bool") {
                violations.push(format!(
                    "{}:{}: found `json: bool` parameter: {line}",
                    relative(&file),
                    i + 1
                ));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Commands read the output mode from AppContext, not a json flag:\n{}",
        violations.join("\n")
    );
}

#[test]
fn command_handlers_accept_app_context() {
    let mut violations: Vec<String> = Vec::new();

    for file in collect_rs_files(&src_dir().join("commands")) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        // `version` runs before configuration is loaded and has no context.
        if !content.contains("pub async fn run(") && !content.contains("pub fn run(app") {
            continue;
        }
        if !content.contains("app: &AppContext") {
            violations.push(relative(&file));
        }
    }

    assert!(
        violations.is_empty(),
        "Command handlers must take `app: &AppContext`:\n{}",
        violations.join("\n")
    );
}
