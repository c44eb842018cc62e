//! Shared helpers for integration tests.
//!
//! [`FakeCloud`] stands in for both `gcloud` and `kubectl`: it keeps secrets
//! and parameter versions in memory, reads applied SecretProviderClass
//! manifests, and answers `cat` / `stat` inside test pods the way the driver
//! and provider would.

#![allow(dead_code, reason = "Not every test binary uses every helper")]

use async_trait::async_trait;
use regex::Regex;
use secrets_store_csi_e2e::config::E2eConfig;
use secrets_store_csi_e2e::constants::MOUNT_DIR;
use secrets_store_csi_e2e::exec::{CommandOutput, CommandRunner, Invocation};
use secrets_store_csi_e2e::error::Result;
use secrets_store_csi_e2e::Fixture;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

pub const PROJECT: &str = "csi-e2e-test-project";
pub const REGION: &str = "us-central1";

/// Configuration with every wait collapsed to a single check
pub fn test_config() -> E2eConfig {
    let env = HashMap::from([
        ("PROJECT_ID", PROJECT),
        ("GCP_PROVIDER_SHA", "3f2c1ab"),
        ("LOCATION_ID", REGION),
        ("SECRET_STORE_VERSION", "v1.4.7"),
        ("GKE_VERSION", "STABLE"),
        ("E2E_CLUSTER_READY_TIMEOUT_SECS", "0"),
        ("E2E_POD_READY_TIMEOUT_SECS", "0"),
        ("E2E_POD_PRE_WAIT_SECS", "0"),
        ("E2E_IAM_PROPAGATION_SECS", "0"),
        ("E2E_VERSION_POLL_TIMEOUT_SECS", "0"),
        ("E2E_ROTATION_TIMEOUT_SECS", "0"),
        ("E2E_POLL_INTERVAL_SECS", "0"),
    ]);
    E2eConfig::from_lookup(|key| env.get(key).map(|v| (*v).to_string()))
        .expect("test configuration is complete")
}

pub fn fixture(cloud: &Arc<FakeCloud>) -> Fixture {
    let runner: Arc<dyn CommandRunner> = Arc::<FakeCloud>::clone(cloud);
    Fixture::new(test_config(), runner).expect("fixture")
}

/// One `secrets:` entry of a SecretProviderClass
#[derive(Debug, Clone)]
struct MountEntry {
    resource: String,
    path: String,
    mode: Option<u32>,
    extract: Option<(&'static str, String)>,
}

#[derive(Debug, Default)]
struct State {
    secrets: BTreeMap<String, Vec<Vec<u8>>>,
    parameters: BTreeMap<String, String>,
    versions: BTreeMap<(String, String), Vec<u8>>,
    mounts: HashMap<String, Vec<MountEntry>>,
    calls: Vec<Invocation>,
    overrides: Vec<(Vec<String>, CommandOutput)>,
    panic_on: Option<String>,
}

/// In-memory stand-in for the cloud and the cluster
#[derive(Debug, Default)]
pub struct FakeCloud {
    state: Mutex<State>,
}

impl FakeCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer every invocation whose rendering contains all `needles`
    ///
    /// Later overrides win.
    pub fn respond(&self, needles: &[&str], output: CommandOutput) {
        let needles = needles.iter().map(|n| (*n).to_string()).collect();
        self.state.lock().unwrap().overrides.push((needles, output));
    }

    /// Panic inside the runner for invocations containing `needle`
    pub fn panic_on(&self, needle: &str) {
        self.state.lock().unwrap().panic_on = Some(needle.to_string());
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Rendered invocations containing `needle`
    pub fn calls_matching(&self, needle: &str) -> Vec<String> {
        self.calls()
            .iter()
            .map(ToString::to_string)
            .filter(|call| call.contains(needle))
            .collect()
    }

    pub fn secret_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().secrets.keys().cloned().collect()
    }

    pub fn secret_versions(&self, secret: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .secrets
            .get(secret)
            .map_or(0, Vec::len)
    }

    pub fn parameter_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().parameters.keys().cloned().collect()
    }

    pub fn version_count(&self) -> usize {
        self.state.lock().unwrap().versions.len()
    }

    /// Raw payload uploaded for a parameter version
    pub fn uploaded_version(&self, parameter: &str, version: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .versions
            .get(&(parameter.to_string(), version.to_string()))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn is_empty(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.secrets.is_empty() && state.parameters.is_empty() && state.versions.is_empty()
    }
}

#[async_trait]
impl CommandRunner for FakeCloud {
    async fn output(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let rendered = invocation.to_string();
        let mut state = self.state.lock().unwrap();
        state.calls.push(invocation.clone());

        if let Some(needle) = &state.panic_on {
            if rendered.contains(needle.as_str()) {
                let needle = needle.clone();
                drop(state);
                panic!("fake runner told to panic on `{needle}`");
            }
        }
        if let Some((_, output)) = state
            .overrides
            .iter()
            .rev()
            .find(|(needles, _)| needles.iter().all(|n| rendered.contains(n.as_str())))
        {
            return Ok(output.clone());
        }

        let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
        Ok(match invocation.program.as_str() {
            "gcloud" => gcloud(&mut state, &args),
            "kubectl" => kubectl(&mut state, &args),
            other => CommandOutput::failed(127, format!("{other}: command not found")),
        })
    }
}

fn flag<'a>(args: &[&'a str], name: &str) -> Option<&'a str> {
    let prefix = format!("{name}=");
    args.iter().find_map(|a| a.strip_prefix(prefix.as_str()))
}

fn read_file(path: &str) -> Vec<u8> {
    std::fs::read(path).unwrap_or_else(|e| panic!("payload file {path}: {e}"))
}

fn not_found(what: &str) -> CommandOutput {
    CommandOutput::failed(1, format!("ERROR: NOT_FOUND: {what} not found"))
}

fn gcloud(state: &mut State, args: &[&str]) -> CommandOutput {
    match args {
        ["secrets", "create", id, ..] => {
            let data = read_file(flag(args, "--data-file").unwrap());
            state.secrets.insert((*id).to_string(), vec![data]);
            CommandOutput::ok("")
        }
        ["secrets", "versions", "add", id, ..] => {
            let data = read_file(flag(args, "--data-file").unwrap());
            match state.secrets.get_mut(*id) {
                Some(versions) => {
                    versions.push(data);
                    CommandOutput::ok("")
                }
                None => not_found(id),
            }
        }
        ["secrets", "versions", "list", id, ..] => match state.secrets.get(*id) {
            Some(versions) => {
                let listed: Vec<serde_json::Value> = (1..=versions.len())
                    .map(|n| serde_json::json!({ "name": format!("{id}/versions/{n}") }))
                    .collect();
                CommandOutput::ok(serde_json::to_vec(&listed).unwrap())
            }
            None => not_found(id),
        },
        ["secrets", "add-iam-policy-binding", ..] => CommandOutput::ok(""),
        ["secrets", "delete", id, ..] => match state.secrets.remove(*id) {
            Some(_) => CommandOutput::ok(""),
            None => not_found(id),
        },
        ["parametermanager", "parameters", "create", id, ..] => {
            let format = flag(args, "--parameter-format").unwrap_or("UNFORMATTED");
            state.parameters.insert((*id).to_string(), format.to_string());
            CommandOutput::ok("")
        }
        ["parametermanager", "parameters", "describe", id, ..] => {
            if state.parameters.contains_key(*id) {
                CommandOutput::ok(format!(
                    "principal://parametermanager.googleapis.com/projects/123/uid/locations/global/parameters/{id}\n"
                ))
            } else {
                not_found(id)
            }
        }
        ["parametermanager", "parameters", "versions", "create", version, ..] => {
            let parameter = flag(args, "--parameter").unwrap().to_string();
            let data = read_file(flag(args, "--payload-data-from-file").unwrap());
            state
                .versions
                .insert((parameter, (*version).to_string()), data);
            CommandOutput::ok("")
        }
        ["parametermanager", "parameters", "versions", "delete", version, ..] => {
            let parameter = flag(args, "--parameter").unwrap().to_string();
            match state.versions.remove(&(parameter, (*version).to_string())) {
                Some(_) => CommandOutput::ok(""),
                None => not_found(version),
            }
        }
        ["parametermanager", "parameters", "delete", id, ..] => {
            match state.parameters.remove(*id) {
                Some(_) => CommandOutput::ok(""),
                None => not_found(id),
            }
        }
        ["container", "clusters", "get-credentials", ..] => CommandOutput::ok(""),
        _ => CommandOutput::failed(2, format!("unscripted gcloud call: {}", args.join(" "))),
    }
}

fn kubectl(state: &mut State, args: &[&str]) -> CommandOutput {
    match args {
        ["apply", "-f", target] => {
            if !target.starts_with("https://") {
                register_manifest(state, &String::from_utf8_lossy(&read_file(target)));
            }
            CommandOutput::ok("")
        }
        ["wait", ..] | ["rollout", ..] | ["delete", ..] => CommandOutput::ok(""),
        ["logs", ..] => CommandOutput::ok("[pod/csi-secrets-store-provider-gcp-x/provider] ok\n"),
        ["exec", pod, "-c", _, "--", "cat", path] => read_mounted(state, pod, path),
        ["exec", pod, "-c", _, "--", "stat", "-c", "%a", path] => stat_mounted(state, pod, path),
        ["get", "events", selector, ..] => {
            let pod = selector.rsplit('=').next().unwrap_or_default();
            events(state, pod)
        }
        ["get", "pod", pod, ..] => pod_status(state, pod),
        _ => CommandOutput::failed(2, format!("unscripted kubectl call: {}", args.join(" "))),
    }
}

fn register_manifest(state: &mut State, manifest: &str) {
    for document in serde_yaml::Deserializer::from_str(manifest) {
        let value = Value::deserialize(document).unwrap();
        if value["kind"].as_str() != Some("SecretProviderClass") {
            continue;
        }
        let name = value["metadata"]["name"].as_str().unwrap().to_string();
        let secrets = value["spec"]["parameters"]["secrets"].as_str().unwrap();
        let entries: Vec<Value> = serde_yaml::from_str(secrets).unwrap();
        let mounts = entries
            .iter()
            .map(|entry| MountEntry {
                resource: entry["resourceName"].as_str().unwrap().to_string(),
                path: entry["path"].as_str().unwrap().to_string(),
                mode: octal_mode(&entry["mode"]),
                extract: entry["extractJSONKey"]
                    .as_str()
                    .map(|key| ("json", key.to_string()))
                    .or_else(|| {
                        entry["extractYAMLKey"]
                            .as_str()
                            .map(|key| ("yaml", key.to_string()))
                    }),
            })
            .collect();
        state.mounts.insert(name, mounts);
    }
}

/// `mode: 0440` may come back as a number or a string
fn octal_mode(value: &Value) -> Option<u32> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };
    u32::from_str_radix(text.trim_start_matches("0o"), 8).ok()
}

fn mount_entry<'a>(state: &'a State, pod: &str, file: &str) -> Option<&'a MountEntry> {
    state.mounts.get(pod)?.iter().find(|e| e.path == file)
}

fn segment<'a>(resource: &'a str, name: &str) -> Option<&'a str> {
    let mut parts = resource.split('/');
    parts.find(|p| *p == name)?;
    parts.next()
}

fn resolve(state: &State, resource: &str) -> Option<Vec<u8>> {
    if let Some(parameter) = segment(resource, "parameters") {
        let version = segment(resource, "versions")?;
        let raw = state
            .versions
            .get(&(parameter.to_string(), version.to_string()))?;
        return Some(render_references(state, &String::from_utf8_lossy(raw)).into_bytes());
    }
    let secret = segment(resource, "secrets")?;
    state.secrets.get(secret)?.last().cloned()
}

/// Replace `__REF__("//.../secrets/S/versions/N")` with the secret version
fn render_references(state: &State, raw: &str) -> String {
    let pattern = Regex::new(r#"__REF__\(\\?"(//[^"\\]+)\\?"\)"#).unwrap();
    pattern
        .replace_all(raw, |caps: &regex::Captures<'_>| {
            let reference = &caps[1];
            let secret = segment(reference, "secrets").unwrap();
            let version: usize = segment(reference, "versions").unwrap().parse().unwrap();
            let bytes = &state.secrets[secret][version - 1];
            String::from_utf8_lossy(bytes).into_owned()
        })
        .into_owned()
}

fn extract(content: &[u8], format: &str, key: &str) -> Vec<u8> {
    let value = match format {
        "json" => {
            let json: serde_json::Value = serde_json::from_slice(content).unwrap();
            json[key].as_str().unwrap().to_string()
        }
        _ => {
            let yaml: Value = serde_yaml::from_slice(content).unwrap();
            yaml[key].as_str().unwrap().to_string()
        }
    };
    value.into_bytes()
}

fn read_mounted(state: &State, pod: &str, path: &str) -> CommandOutput {
    let missing = || CommandOutput::failed(1, format!("cat: can't open '{path}': No such file or directory"));
    let Some(file) = path.strip_prefix(&format!("{MOUNT_DIR}/")) else {
        return missing();
    };
    let Some(entry) = mount_entry(state, pod, file) else {
        return missing();
    };
    let Some(content) = resolve(state, &entry.resource) else {
        return missing();
    };
    match &entry.extract {
        Some((format, key)) => CommandOutput::ok(extract(&content, format, key)),
        None => CommandOutput::ok(content),
    }
}

fn stat_mounted(state: &State, pod: &str, path: &str) -> CommandOutput {
    let Some(file) = path.strip_prefix(&format!("{MOUNT_DIR}/..data/")) else {
        // Entries directly under the mount directory are symlinks
        return CommandOutput::ok("777\n");
    };
    match mount_entry(state, pod, file) {
        Some(entry) => CommandOutput::ok(format!("{:o}\n", entry.mode.unwrap_or(0o644))),
        None => CommandOutput::failed(1, format!("stat: can't stat '{path}': No such file or directory")),
    }
}

fn has_invalid_path(state: &State, pod: &str) -> bool {
    state
        .mounts
        .get(pod)
        .is_some_and(|entries| entries.iter().any(|e| e.path.contains("..")))
}

fn events(state: &State, pod: &str) -> CommandOutput {
    let items = if has_invalid_path(state, pod) {
        vec![serde_json::json!({
            "apiVersion": "v1",
            "kind": "Event",
            "metadata": { "name": format!("{pod}.1") },
            "involvedObject": { "kind": "Pod", "name": pod },
            "reason": "FailedMount",
            "message": format!(
                "MountVolume.SetUp failed for volume \"secrets\" : rpc error: code = Unknown desc = failed to mount secrets store objects for pod default/{pod}, err: rpc error: code = InvalidArgument desc = invalid path ../x"
            ),
        })]
    } else {
        Vec::new()
    };
    let list = serde_json::json!({ "apiVersion": "v1", "kind": "List", "items": items });
    CommandOutput::ok(list.to_string())
}

fn pod_status(state: &State, pod: &str) -> CommandOutput {
    let ready = if has_invalid_path(state, pod) { "False" } else { "True" };
    let pod = serde_json::json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": { "name": pod },
        "status": { "conditions": [{ "type": "Ready", "status": ready }] },
    });
    CommandOutput::ok(pod.to_string())
}
