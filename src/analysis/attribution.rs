//! Attribution of observed code elements to declared dependencies.
//!
//! The static-analysis tool reports, per module, how often each function,
//! class or resource type is used. Which dependency provides an element is
//! guessed from naming conventions alone:
//!
//! - `mysql::password` is namespaced, so it belongs to `mysql`
//! - `mysql_password` follows the flat `prefix_symbol` style, so also `mysql`
//! - the guessed name is matched against the last `-` segment of each
//!   declared `owner-name` dependency, first match wins
//!
//! The suffix match can collide: a dependency named `foobar-notify` is
//! credited for every use of the built-in `notify` resource. That is an
//! accepted error of the heuristic, and it is kept as-is.

use serde::{Deserialize, Serialize};

/// Separator between a namespace and a symbol's local name.
pub const NAMESPACE_SEPARATOR: &str = "::";

/// One observed element with its usage count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageObservation {
    /// Plural element kind as reported by the analysis tool, e.g. `classes`.
    pub kind: String,
    /// Element name as written in code.
    pub element: String,
    /// Number of uses.
    pub count: u64,
}

impl UsageObservation {
    /// Creates a new observation.
    pub fn new(kind: impl Into<String>, element: impl Into<String>, count: u64) -> Self {
        Self {
            kind: kind.into(),
            element: element.into(),
            count,
        }
    }
}

/// One attributed output row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageRow {
    pub module: String,
    pub version: String,
    /// Slug of the dependency guessed to provide the element.
    pub source: Option<String>,
    /// Singular element kind, e.g. `class`.
    pub kind: String,
    pub element: String,
    pub count: u64,
}

impl UsageRow {
    /// Returns true if a source was found for the element.
    pub fn is_attributed(&self) -> bool {
        self.source.is_some()
    }
}

/// Turns a plural kind into its singular form.
///
/// Only the plural forms the analysis tool emits are handled: a trailing
/// `ses` loses its `es` (`classes`), otherwise one trailing `s` is dropped
/// (`functions`, `types`).
///
/// ```
/// use modscope::analysis::normalize_kind;
///
/// assert_eq!(normalize_kind("classes"), "class");
/// assert_eq!(normalize_kind("functions"), "function");
/// assert_eq!(normalize_kind("admin"), "admin");
/// ```
pub fn normalize_kind(kind: &str) -> &str {
    if kind.ends_with("ses") {
        &kind[..kind.len() - 2]
    } else {
        kind.strip_suffix('s').unwrap_or(kind)
    }
}

/// Returns the bare name of an `owner-name` slug.
pub fn bare_name(slug: &str) -> &str {
    slug.rsplit_once('-').map_or(slug, |(_, name)| name)
}

/// Guesses the dependency name an element comes from.
pub fn guess_depname(element: &str) -> &str {
    let mut segments = element.split(NAMESPACE_SEPARATOR);
    let first = segments.next().unwrap_or(element);
    if segments.next().is_some() {
        return first;
    }
    element.split('_').next().unwrap_or(element)
}

/// Finds the first dependency whose bare name is `depname`.
pub fn find_source<'a, S: AsRef<str>>(dependencies: &'a [S], depname: &str) -> Option<&'a str> {
    dependencies
        .iter()
        .map(AsRef::as_ref)
        .find(|dep| bare_name(dep) == depname)
}

/// Attributes every observation of one module version to a dependency.
///
/// Produces exactly one row per observation, in input order. An element
/// named after the module itself is looked up whole, without splitting
/// it into a namespace or prefix.
///
/// # Example
///
/// ```
/// use modscope::analysis::{resolve, UsageObservation};
///
/// let deps = ["puppetlabs-stdlib", "acme-mysql"];
/// let observations = vec![
///     UsageObservation::new("functions", "mysql::password", 1),
///     UsageObservation::new("functions", "mysql_password", 2),
///     UsageObservation::new("types", "totally_unknown_thing", 1),
/// ];
///
/// let rows = resolve("acme-widget", "1.0.0", &deps, &observations);
///
/// assert_eq!(rows.len(), 3);
/// assert_eq!(rows[0].source.as_deref(), Some("acme-mysql"));
/// assert_eq!(rows[1].source.as_deref(), Some("acme-mysql"));
/// assert_eq!(rows[2].source, None);
/// assert_eq!(rows[0].kind, "function");
/// ```
pub fn resolve<S: AsRef<str>>(
    module_slug: &str,
    version: &str,
    dependencies: &[S],
    observations: &[UsageObservation],
) -> Vec<UsageRow> {
    let own_name = bare_name(module_slug);

    observations
        .iter()
        .map(|obs| {
            let depname = if obs.element == own_name {
                obs.element.as_str()
            } else {
                guess_depname(&obs.element)
            };
            let source = find_source(dependencies, depname);

            UsageRow {
                module: module_slug.to_string(),
                version: version.to_string(),
                source: source.map(str::to_string),
                kind: normalize_kind(&obs.kind).to_string(),
                element: obs.element.clone(),
                count: obs.count,
            }
        })
        .collect()
}

/// The bookkeeping row recording that a module version was itemized.
pub fn version_marker(module_slug: &str, version: &str) -> UsageRow {
    UsageRow {
        module: module_slug.to_string(),
        version: version.to_string(),
        source: None,
        kind: "admin".to_string(),
        element: "version".to_string(),
        count: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DEPS: [&str; 2] = ["puppetlabs-stdlib", "acme-mysql"];

    fn resolve_one(kind: &str, element: &str, count: u64) -> UsageRow {
        let rows = resolve(
            "acme-widget",
            "1.0.0",
            &DEPS,
            &[UsageObservation::new(kind, element, count)],
        );
        assert_eq!(rows.len(), 1);
        rows.into_iter().next().unwrap()
    }

    // ===== Kind Normalization =====

    #[test]
    fn test_normalize_kind() {
        assert_eq!(normalize_kind("classes"), "class");
        assert_eq!(normalize_kind("functions"), "function");
        assert_eq!(normalize_kind("types"), "type");
        assert_eq!(normalize_kind("resources"), "resource");
        assert_eq!(normalize_kind("admin"), "admin");
        assert_eq!(normalize_kind(""), "");
    }

    #[test]
    fn test_normalize_kind_is_narrow() {
        // Not general English pluralization.
        assert_eq!(normalize_kind("boxes"), "boxe");
        assert_eq!(normalize_kind("properties"), "propertie");
        assert_eq!(normalize_kind("ses"), "s");
    }

    // ===== Depname Guessing =====

    #[test]
    fn test_guess_depname() {
        assert_eq!(guess_depname("mysql::password"), "mysql");
        assert_eq!(guess_depname("mysql::server::config"), "mysql");
        assert_eq!(guess_depname("mysql_password"), "mysql");
        assert_eq!(guess_depname("notify"), "notify");
        assert_eq!(guess_depname("::toplevel"), "");
    }

    #[test]
    fn test_namespace_takes_priority_over_underscore() {
        assert_eq!(guess_depname("apache_ext::vhost_custom"), "apache_ext");
    }

    #[test]
    fn test_bare_name() {
        assert_eq!(bare_name("acme-widget"), "widget");
        assert_eq!(bare_name("widget"), "widget");
        assert_eq!(bare_name("a-b-c"), "c");
    }

    // ===== Attribution =====

    #[test]
    fn test_namespaced_attribution() {
        let row = resolve_one("functions", "mysql::password", 1);

        assert_eq!(row.source.as_deref(), Some("acme-mysql"));
        assert_eq!(row.kind, "function");
        assert_eq!(row.count, 1);
    }

    #[test]
    fn test_flat_name_fallback() {
        let row = resolve_one("functions", "mysql_password", 2);

        assert_eq!(row.source.as_deref(), Some("acme-mysql"));
        assert_eq!(row.count, 2);
    }

    #[test]
    fn test_unresolved_source() {
        let row = resolve_one("functions", "totally_unknown_thing", 5);

        assert_eq!(row.source, None);
        assert!(!row.is_attributed());
        assert_eq!(row.element, "totally_unknown_thing");
    }

    #[test]
    fn test_self_reference() {
        let row = resolve_one("classes", "widget", 3);

        assert_eq!(row.kind, "class");
        assert_eq!(row.source, None);
        assert_eq!(row.module, "acme-widget");
        assert_eq!(row.version, "1.0.0");
    }

    #[test]
    fn test_self_reference_matches_same_named_dependency() {
        let rows = resolve(
            "acme-widget",
            "1.0.0",
            &["puppetlabs-stdlib", "other-widget"],
            &[UsageObservation::new("classes", "widget", 1)],
        );

        assert_eq!(rows[0].source.as_deref(), Some("other-widget"));
    }

    #[test]
    fn test_self_reference_keeps_underscored_name_whole() {
        let deps = ["acme-mysql", "puppetlabs-mysql_tools"];
        let rows = resolve(
            "acme-mysql_tools",
            "2.0.0",
            &deps,
            &[
                UsageObservation::new("classes", "mysql_tools", 1),
                UsageObservation::new("classes", "mysql_backup", 1),
            ],
        );

        assert_eq!(rows[0].source.as_deref(), Some("puppetlabs-mysql_tools"));
        assert_eq!(rows[1].source.as_deref(), Some("acme-mysql"));
    }

    #[test]
    fn test_namespaced_self_class_resolves_through_dependencies() {
        let row = resolve_one("classes", "widget::params", 1);

        assert_eq!(row.source, None);
    }

    #[test]
    fn test_first_matching_dependency_wins() {
        let deps = ["puppetlabs-mysql", "acme-mysql"];
        let rows = resolve(
            "acme-widget",
            "1.0.0",
            &deps,
            &[UsageObservation::new("classes", "mysql::server", 1)],
        );

        assert_eq!(rows[0].source.as_deref(), Some("puppetlabs-mysql"));
    }

    #[test]
    fn test_builtin_collision_is_credited_to_dependency() {
        let deps = ["foobar-notify"];
        let rows = resolve(
            "acme-widget",
            "1.0.0",
            &deps,
            &[UsageObservation::new("types", "notify", 4)],
        );

        assert_eq!(rows[0].source.as_deref(), Some("foobar-notify"));
        assert_eq!(rows[0].kind, "type");
    }

    #[test]
    fn test_owned_dependency_strings() {
        let deps: Vec<String> = vec!["puppetlabs-stdlib".to_string()];
        let rows = resolve(
            "acme-widget",
            "1.0.0",
            &deps,
            &[UsageObservation::new("functions", "stdlib::ensure", 1)],
        );

        assert_eq!(rows[0].source.as_deref(), Some("puppetlabs-stdlib"));
    }

    #[test]
    fn test_empty_observations() {
        let rows = resolve("acme-widget", "1.0.0", &DEPS, &[]);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_version_marker() {
        let row = version_marker("acme-widget", "1.0.0");

        assert_eq!(row.kind, "admin");
        assert_eq!(row.element, "version");
        assert_eq!(row.count, 0);
        assert_eq!(row.source, None);
    }

    // ===== Invariants =====

    fn arb_observation() -> impl Strategy<Value = UsageObservation> {
        (
            prop_oneof![
                Just("classes".to_string()),
                Just("functions".to_string()),
                Just("types".to_string()),
                "[a-z]{0,8}",
            ],
            "[a-z_:]{0,16}",
            0u64..1000,
        )
            .prop_map(|(kind, element, count)| UsageObservation::new(kind, element, count))
    }

    proptest! {
        #[test]
        fn prop_one_row_per_observation(
            deps in prop::collection::vec("[a-z]{1,6}-[a-z_]{1,8}", 0..6),
            observations in prop::collection::vec(arb_observation(), 0..40),
        ) {
            let rows = resolve("acme-widget", "1.0.0", &deps, &observations);

            prop_assert_eq!(rows.len(), observations.len());
            for (row, obs) in rows.iter().zip(&observations) {
                prop_assert_eq!(&row.element, &obs.element);
                prop_assert_eq!(row.count, obs.count);
            }
        }

        #[test]
        fn prop_resolve_is_deterministic(
            deps in prop::collection::vec("[a-z]{1,6}-[a-z_]{1,8}", 0..6),
            observations in prop::collection::vec(arb_observation(), 0..20),
        ) {
            let first = resolve("acme-widget", "1.0.0", &deps, &observations);
            let second = resolve("acme-widget", "1.0.0", &deps, &observations);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_source_is_a_dependency(
            deps in prop::collection::vec("[a-z]{1,6}-[a-z_]{1,8}", 0..6),
            observations in prop::collection::vec(arb_observation(), 0..20),
        ) {
            let rows = resolve("acme-widget", "1.0.0", &deps, &observations);
            for row in rows {
                if let Some(source) = row.source {
                    prop_assert!(deps.contains(&source));
                }
            }
        }
    }
}
