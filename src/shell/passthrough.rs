//! Commands that hand the current directory to an external tool.
//!
//! The directory is pushed before the tool starts so it sees the virtual
//! content, and pulled afterwards so files the tool created show up.

use super::Shell;
use crate::errors::CoreError;
use crate::external::{split_args, ToolOutput};
use crate::models::Flow;
use crate::tree::DirId;

fn report(shell: &mut Shell, program: &str, output: &ToolOutput) {
    shell.output.out_block(&output.stdout);
    shell.output.err_block(&output.stderr);
    match output.status {
        Some(0) => {}
        Some(code) => shell.output.err(format!("{program} exited with code {code}")),
        None => shell
            .output
            .err(format!("{program} was terminated by a signal")),
    }
}

fn run_in_cwd(shell: &mut Shell, program: &str, args: &[String]) -> crate::Result<Flow> {
    let cwd = shell.session.cwd;
    let pushed = shell.mirror.push_dir(&shell.tree, cwd);
    shell.report_push(pushed);

    let real = shell.mirror.real_path(&shell.tree, cwd);
    let output = shell.runner.run(program, args, &real)?;
    tracing::info!(program, status = ?output.status, "tool finished");
    report(shell, program, &output);

    match shell.mirror.pull(&mut shell.tree, cwd, true) {
        Ok(pulled) => {
            if !pulled.is_noop() {
                shell.output.out(format!(
                    "{} director(ies) and {} file(s) brought in from disk.",
                    pulled.dirs_added, pulled.files_added
                ));
            }
            if !pulled.skipped.is_empty() {
                for skipped in &pulled.skipped {
                    tracing::warn!(entry = %skipped, "left on disk after {program}");
                }
                shell.output.err(format!(
                    "{} disk entr(ies) could not be brought in",
                    pulled.skipped.len()
                ));
            }
        }
        Err(err) => shell.report_sync::<()>(Err(err)),
    }
    Ok(Flow::Continue)
}

fn require_tool(shell: &Shell, program: &str) -> crate::Result<()> {
    if shell.runner.is_available(program) {
        Ok(())
    } else {
        Err(CoreError::precondition(format!("{program} is not installed or not on PATH")))
    }
}

pub(super) fn git(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let args = split_args(arg);
    if args.is_empty() {
        return Err(CoreError::invalid_input("usage: GIT <args>"));
    }
    require_tool(shell, "git")?;
    run_in_cwd(shell, "git", &args)
}

pub(super) fn exec(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let mut args = split_args(arg);
    if args.is_empty() {
        return Err(CoreError::invalid_input("usage: EXEC <program> [args]"));
    }
    let program = args.remove(0);
    run_in_cwd(shell, &program, &args)
}

pub(super) fn serve(shell: &mut Shell, arg: &str) -> crate::Result<Flow> {
    let mut args = split_args(arg);
    if args.is_empty() {
        return Err(CoreError::invalid_input("usage: SERVE <program> [args]"));
    }
    let program = args.remove(0);
    let cwd = shell.session.cwd;
    let pushed = shell.mirror.push_dir(&shell.tree, cwd);
    shell.report_push(pushed);

    let real = shell.mirror.real_path(&shell.tree, cwd);
    let pid = shell.runner.spawn_detached(&program, &args, &real)?;
    shell
        .output
        .out(format!("Started {program} (pid {pid}) in {}.", real.display()));
    Ok(Flow::Continue)
}

/// How `BUILD` handles the project found in a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BuildPlan {
    pub program: &'static str,
    pub args: Vec<String>,
}

fn has_extension(name: &str, ext: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(stem, found)| !stem.is_empty() && found.eq_ignore_ascii_case(ext))
}

/// Picks a build from the files in and below `dir`.
///
/// A manifest directly in `dir` wins; otherwise the sources decide, C++ before
/// C before Python.
pub(crate) fn detect_build(shell: &Shell, dir: DirId) -> Option<BuildPlan> {
    let tree = &shell.tree;
    let own = |name: &str| tree.find_file(dir, name).is_some();
    if own("Cargo.toml") {
        return Some(BuildPlan {
            program: "cargo",
            args: vec!["build".to_string()],
        });
    }
    if own("Makefile") {
        return Some(BuildPlan {
            program: "make",
            args: Vec::new(),
        });
    }
    if own("package.json") {
        return Some(BuildPlan {
            program: "npm",
            args: vec!["run".to_string(), "build".to_string()],
        });
    }

    let sources = |ext: &str| -> Vec<String> {
        tree.files_below(dir)
            .filter(|(_, file)| has_extension(file.name(), ext))
            .map(|(owner, file)| {
                shell
                    .mirror
                    .real_entry_path(tree, owner, file.name())
                    .display()
                    .to_string()
            })
            .collect()
    };
    let compiled = |program: &'static str, mut files: Vec<String>| {
        files.extend(["-o".to_string(), "main".to_string()]);
        BuildPlan {
            program,
            args: files,
        }
    };

    let cpp = sources("cpp");
    if !cpp.is_empty() {
        return Some(compiled("g++", cpp));
    }
    let c = sources("c");
    if !c.is_empty() {
        return Some(compiled("cc", c));
    }
    if own("main.py") {
        let main = shell.mirror.real_entry_path(tree, dir, "main.py");
        return Some(BuildPlan {
            program: "python3",
            args: vec![main.display().to_string()],
        });
    }
    sources("py").into_iter().next().map(|script| BuildPlan {
        program: "python3",
        args: vec![script],
    })
}

pub(super) fn build(shell: &mut Shell, _arg: &str) -> crate::Result<Flow> {
    let cwd = shell.session.cwd;
    let plan = detect_build(shell, cwd).ok_or_else(|| {
        CoreError::precondition("no Cargo.toml, Makefile, package.json, C/C++ or Python sources here")
    })?;
    require_tool(shell, plan.program)?;
    shell
        .output
        .out(format!("> {} {}", plan.program, plan.args.join(" ")));
    run_in_cwd(shell, plan.program, &plan.args)
}
