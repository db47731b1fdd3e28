// Shared helpers for exercising the harness without the real node and
// generator binaries: small shell scripts play their roles.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::output_path;

/// Writes an executable `/bin/sh` script into `dir` and returns its path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}

fn command(path: PathBuf) -> Vec<String> {
    vec![path.to_string_lossy().into_owned()]
}

/// A generator that emits nothing and exits at once.
pub fn silent_generator(dir: &Path) -> Vec<String> {
    command(write_script(dir, "gen_silent.sh", "exit 0"))
}

/// A generator that emits `count` numbered transaction lines and exits.
pub fn counting_generator(dir: &Path, count: usize) -> Vec<String> {
    let body = format!(
        "i=1\nwhile [ $i -le {} ]; do\n  echo \"tx $i\"\n  i=$((i+1))\ndone",
        count
    );
    command(write_script(dir, "gen_count.sh", &body))
}

/// A node that copies its stdin to its stdout and exits on EOF.
pub fn cat_node(dir: &Path) -> Vec<String> {
    command(write_script(dir, "node_cat.sh", "exec cat"))
}

/// A node that writes nothing and runs until killed.
pub fn sleeping_node(dir: &Path) -> Vec<String> {
    command(write_script(dir, "node_sleep.sh", "exec sleep 600"))
}

/// A node that writes `payload` to its stdout and then runs until killed.
/// The payload must not contain single quotes.
pub fn constant_node(dir: &Path, payload: &str) -> Vec<String> {
    let body = format!("printf '%s' '{}'\nexec sleep 600", payload);
    command(write_script(dir, "node_const.sh", &body))
}

/// Like [`constant_node`], except the node whose first argument matches
/// `special_id` writes `special_payload` instead.
pub fn divergent_node(
    dir: &Path,
    payload: &str,
    special_id: &str,
    special_payload: &str,
) -> Vec<String> {
    let body = format!(
        "if [ \"$1\" = \"{}\" ]; then\n  printf '%s' '{}'\nelse\n  printf '%s' '{}'\nfi\nexec sleep 600",
        special_id, special_payload, payload
    );
    command(write_script(dir, "node_div.sh", &body))
}

/// Plants an output file directly, bypassing any node.
pub fn write_output(dir: &Path, index: usize, contents: &[u8]) {
    fs::write(output_path(dir, index), contents).unwrap();
}
