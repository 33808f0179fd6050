use std::collections::HashMap;

/// Fields owned by the logging layer itself. Caller-supplied context maps
/// must never be allowed to overwrite these when a log line is built, per
/// the reserved-field invariant (testable property 9).
pub const RESERVED_FIELDS: &[&str] = &["time", "level", "msg", "component"];

/// Logs an informational line for `component`, merging `context` in but
/// silently dropping any key that collides with a reserved field rather
/// than letting it clobber one.
pub fn log_component(component: &'static str, msg: &str, context: HashMap<String, serde_json::Value>) {
    let safe_context: HashMap<&String, &serde_json::Value> = context
        .iter()
        .filter(|(k, _)| !RESERVED_FIELDS.contains(&k.as_str()))
        .collect();
    let context_json = serde_json::to_string(&safe_context).unwrap_or_default();
    tracing::info!(component = component, context = %context_json, "{msg}");
}
