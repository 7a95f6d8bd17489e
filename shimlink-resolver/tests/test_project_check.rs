use shimlink_resolver::{
    diff_tables, BuildTarget, CheckPolicy, ConformanceViolation, LockFile, LockIssue, ModuleLoader,
    ShimConfig, ShimContractChecker, TargetResolver, UsageIndex, CONFIG_FILE, LOCK_FILE,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"{
  "name": "community-aid",
  "platforms": ["ios", "android", "native", "web"],
  "aliases": [
    {
      "module": "react-native-maps",
      "targets": ["web"],
      "path": "./web-stubs/react-native-maps.js",
      "fillDefaults": true
    }
  ],
  "checker": { "appRoots": ["app"] }
}"#;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A small app with a native map library and a web stand-in for it
fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(root, CONFIG_FILE, CONFIG);
    write(
        root,
        "web-stubs/react-native-maps.js",
        include_str!("fixtures/react-native-maps.web.js"),
    );
    write(root, "app/needs-map.tsx", include_str!("fixtures/needs-map.tsx"));
    write(
        root,
        "app/route-map.tsx",
        "import MapView, { Polyline } from 'react-native-maps';\n\
         export const RouteMap = ({ route }) => <MapView><Polyline coordinates={route} /></MapView>;\n",
    );

    write(
        root,
        "node_modules/react-native-maps/package.json",
        r#"{ "name": "react-native-maps", "main": "lib/index.js" }"#,
    );
    write(
        root,
        "node_modules/react-native-maps/lib/index.js",
        "import MapView from './MapView';\n\
         export default MapView;\n\
         export { MapView };\n\
         export { default as Marker } from './MapMarker';\n\
         export * from './overlays';\n\
         export const PROVIDER_GOOGLE = 'google';\n\
         export const PROVIDER_DEFAULT = null;\n",
    );
    write(
        root,
        "node_modules/react-native-maps/lib/MapView.js",
        "export default class MapView extends React.Component {}\n",
    );
    write(
        root,
        "node_modules/react-native-maps/lib/MapMarker.js",
        "export default class MapMarker extends React.Component {}\n",
    );
    write(
        root,
        "node_modules/react-native-maps/lib/overlays.js",
        "export function Polyline(props) {}\nexport function Circle(props) {}\n",
    );

    dir
}

#[test]
fn test_web_shim_missing_one_used_symbol() {
    let dir = project();
    let config = ShimConfig::from_file(dir.path().join(CONFIG_FILE)).unwrap();
    let table = config.build_table().unwrap();
    let loader = config.loader(dir.path());
    let usage = UsageIndex::scan(dir.path(), &config.checker.app_roots, &config.source_exts).unwrap();

    let checker = ShimContractChecker::new(&loader, BuildTarget::Web).with_usage(&usage);
    let result = checker.verify_table(&table);

    assert!(result.failures.is_empty());
    assert_eq!(result.reports.len(), 1);

    let report = &result.reports[0];
    assert_eq!(
        report.checked,
        vec!["Marker", "PROVIDER_GOOGLE", "Polyline", "default"]
    );
    assert_eq!(report.violations.len(), 1);
    match &report.violations[0] {
        ConformanceViolation::MissingSymbol { symbol, uses, .. } => {
            assert_eq!(symbol, "Polyline");
            assert_eq!(uses.len(), 1);
            assert!(uses[0].file.ends_with("route-map.tsx"));
        }
        other => panic!("unexpected violation {:?}", other),
    }

    assert!(result.passes(CheckPolicy::Report));
    assert!(!result.passes(CheckPolicy::Strict));
}

#[test]
fn test_complete_shim_passes_strict() {
    let dir = project();
    fs::remove_file(dir.path().join("app/route-map.tsx")).unwrap();

    let config = ShimConfig::from_file(dir.path().join(CONFIG_FILE)).unwrap();
    let table = config.build_table().unwrap();
    let loader = config.loader(dir.path());
    let usage = UsageIndex::scan(dir.path(), &config.checker.app_roots, &config.source_exts).unwrap();

    let result = ShimContractChecker::new(&loader, BuildTarget::Web)
        .with_usage(&usage)
        .verify_table(&table);
    assert_eq!(result.violation_count(), 0);
    assert!(result.passes(CheckPolicy::Strict));
}

#[test]
fn test_native_targets_have_nothing_to_check() {
    let dir = project();
    let config = ShimConfig::from_file(dir.path().join(CONFIG_FILE)).unwrap();
    let table = config.build_table().unwrap();
    let loader = config.loader(dir.path());

    let result = ShimContractChecker::new(&loader, BuildTarget::Ios).verify_table(&table);
    assert!(result.reports.is_empty());
    assert!(result.failures.is_empty());
}

#[test]
fn test_resolve_path_per_target() {
    let dir = project();
    let config = ShimConfig::from_file(dir.path().join(CONFIG_FILE)).unwrap();
    let loader = config.loader(dir.path());
    let resolver = TargetResolver::new(config.build_table().unwrap());

    let web = resolver
        .resolve_path("react-native-maps", BuildTarget::Web, &loader)
        .unwrap();
    assert!(web.ends_with("web-stubs/react-native-maps.js"));

    let ios = resolver
        .resolve_path("react-native-maps", BuildTarget::Ios, &loader)
        .unwrap();
    assert!(ios.ends_with("node_modules/react-native-maps/lib/index.js"));

    assert!(loader.load("react-native-svg", BuildTarget::Web).is_err());
}

#[test]
fn test_lock_detects_edited_shim() {
    let dir = project();
    let config = ShimConfig::from_file(dir.path().join(CONFIG_FILE)).unwrap();
    let table = config.build_table().unwrap();
    let loader = config.loader(dir.path());

    LockFile::generate(&table, &loader)
        .unwrap()
        .to_file(dir.path().join(LOCK_FILE))
        .unwrap();
    let lockfile = LockFile::from_file(dir.path().join(LOCK_FILE)).unwrap();
    assert!(lockfile.validate(&table, &loader).is_empty());

    write(
        dir.path(),
        "web-stubs/react-native-maps.js",
        "export default function MapView() { return null; }\n",
    );
    let issues = lockfile.validate(&table, &loader);
    assert!(matches!(issues.as_slice(), [LockIssue::IntegrityMismatch { .. }]));
}

#[test]
fn test_drift_between_configs() {
    let dir = project();
    let config = ShimConfig::from_file(dir.path().join(CONFIG_FILE)).unwrap();

    let mut other = ShimConfig::default();
    other.name = "community-aid-web".to_string();
    other.to_file(dir.path().join("shimlink.web.json")).unwrap();
    let other = ShimConfig::from_file(dir.path().join("shimlink.web.json")).unwrap();

    let drift = diff_tables(&config.build_table().unwrap(), &other.build_table().unwrap());
    // both codegen helpers are only configured on the right, on all four targets
    assert_eq!(drift.len(), 8);
}
