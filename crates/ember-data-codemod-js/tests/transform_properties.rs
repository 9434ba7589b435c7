// Copyright (c) Ember Data Codemod contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Behavioral tests for `transform_source` against the bundled table.

use ember_data_codemod_core::config::{QuoteStyle, TransformOptions};
use ember_data_codemod_core::diagnostic::Diagnostic;
use ember_data_codemod_core::mapping::MappingTable;
use ember_data_codemod_js::{transform_file, transform_source, TransformOutput};

fn run(source: &str) -> TransformOutput {
    let table = MappingTable::bundled().unwrap();
    transform_source("app/models/shoe.js", source, &table, &TransformOptions::default()).unwrap()
}

#[test]
fn crlf_sources_keep_their_terminator() {
    let source = "import DS from 'ember-data';\r\nexport default DS.Model.extend({ adapter: DS.JSONAPIAdapter });\r\n";
    let output = run(source);
    assert_eq!(
        output.source,
        "import Model from '@ember-data/model';\r\nimport JSONAPIAdapter from '@ember-data/adapter/json-api';\r\nexport default Model.extend({ adapter: JSONAPIAdapter });\r\n"
    );
    assert!(!output.source.replace("\r\n", "").contains('\n'));
}

#[test]
fn new_specifiers_merge_into_existing_declaration() {
    let source = "import { attr } from \"@ember-data/model\";\nimport DS from 'ember-data';\nexport default DS.Model.extend({ name: attr() });\n";
    let output = run(source);
    assert_eq!(
        output.source,
        "import Model, { attr } from \"@ember-data/model\";\nexport default Model.extend({ name: attr() });\n"
    );
}

#[test]
fn duplicate_specifiers_collapse_after_literal_rewrite() {
    let source = "import { attr } from '@ember-data/model';\nimport attr from 'ember-data/attr';\n";
    let output = run(source);
    assert_eq!(output.source, "import { attr } from '@ember-data/model';\n");
}

#[test]
fn bare_namespace_reference_keeps_import() {
    let source = "import DS from 'ember-data';\nconst store = DS;\nDS.Model.extend();\n";
    let output = run(source);
    assert_eq!(
        output.source,
        "import Model from '@ember-data/model';\nimport DS from 'ember-data';\nconst store = DS;\nModel.extend();\n"
    );
}

#[test]
fn new_imports_go_above_existing_imports() {
    let source = "import Ember from 'ember';\nimport DS from 'ember-data';\nexport default DS.Model.extend();\n";
    let output = run(source);
    assert_eq!(
        output.source,
        "import Model from '@ember-data/model';\nimport Ember from 'ember';\nexport default Model.extend();\n"
    );

    let source = "// app/models/shoe.js\n\nimport Ember from 'ember';\nimport DS from 'ember-data';\nDS.Model.extend();\n";
    let output = run(source);
    assert_eq!(
        output.source,
        "// app/models/shoe.js\n\nimport Model from '@ember-data/model';\nimport Ember from 'ember';\nModel.extend();\n"
    );
}

#[test]
fn comment_attached_to_removed_alias_goes_with_it() {
    let source = "import DS from 'ember-data';\n\n// attributes\nconst { attr } = DS;\n\nexport default DS.Model.extend({ name: attr() });\n";
    let output = run(source);
    assert_eq!(
        output.source,
        "import Model, { attr } from '@ember-data/model';\n\nexport default Model.extend({ name: attr() });\n"
    );
}

#[test]
fn renamed_namespace_import_is_removed_when_unused() {
    let source = "import Data from 'ember-data';\nexport default Data.Model.extend({ name: Data.attr() });\n";
    let output = run(source);
    assert_eq!(
        output.source,
        "import Model, { attr } from '@ember-data/model';\nexport default Model.extend({ name: attr() });\n"
    );
}

#[test]
fn deep_paths_resolve_through_inline_table() {
    let table = MappingTable::from_json(
        "DS",
        r#"[{"global": "DS.a.b.c", "module": "deep", "export": "c"}]"#,
    )
    .unwrap();
    let source = "import DS from 'ember-data';\nDS.a.b.c();\n";
    let output = transform_source("a.js", source, &table, &TransformOptions::default()).unwrap();
    assert_eq!(output.source, "import { c } from 'deep';\nc();\n");
}

#[test]
fn partly_mappable_pending_parent_is_kept() {
    let table = MappingTable::from_json(
        "DS",
        r#"[{"global": "DS.computed.oneWay", "module": "@ember/object/computed", "export": "oneWay"}]"#,
    )
    .unwrap();
    let source = "import DS from 'ember-data';\nconst { computed } = DS;\nconst { oneWay, foo } = computed;\nexport default { a: oneWay('x'), b: foo };\n";
    let output = transform_source("a.js", source, &table, &TransformOptions::default()).unwrap();
    assert_eq!(
        output.source,
        "import { oneWay } from '@ember/object/computed';\nimport DS from 'ember-data';\nconst { computed } = DS;\nconst { foo } = computed;\nexport default { a: oneWay('x'), b: foo };\n"
    );
    let unmapped: Vec<(&str, u32)> = output
        .diagnostics
        .iter()
        .filter_map(|d| match d {
            Diagnostic::UnmappedGlobal {
                dotted_path, line, ..
            } => Some((dotted_path.as_str(), *line)),
            _ => None,
        })
        .collect();
    assert_eq!(unmapped, [("computed", 2), ("computed.foo", 3)]);
    assert_eq!(output.diagnostics.len(), 2);
}

#[test]
fn module_level_name_collision_is_reported() {
    let source = "import DS from 'ember-data';\nconst Store = makeStore();\nDS.Store.create();\n";
    let output = run(source);
    assert!(!output.changed);
    assert_eq!(output.source, source);
    match &output.diagnostics[..] {
        [Diagnostic::AmbiguousLocalName {
            line,
            local_name,
            existing,
            ..
        }] => {
            assert_eq!(*line, 3);
            assert_eq!(local_name, "Store");
            assert_eq!(existing, "another declaration in this file");
        }
        other => panic!("unexpected diagnostics: {:?}", other),
    }
}

#[test]
fn global_namespace_without_import() {
    let source = "// A model.\n\nexport default DS.Model.extend();\n";
    let output = run(source);
    assert_eq!(
        output.source,
        "// A model.\n\nimport Model from '@ember-data/model';\nexport default Model.extend();\n"
    );
}

#[test]
fn double_quote_style_applies_to_new_literals() {
    let table = MappingTable::bundled().unwrap();
    let options = TransformOptions {
        quote: QuoteStyle::Double,
        ..TransformOptions::default()
    };
    let source = "import DS from 'ember-data';\nDS.Model.extend();\n";
    let output = transform_source("a.js", source, &table, &options).unwrap();
    assert_eq!(
        output.source,
        "import Model from \"@ember-data/model\";\nModel.extend();\n"
    );
}

#[test]
fn files_without_namespace_are_untouched() {
    let source = "import Component from '@glimmer/component';\nexport default class Shoe extends Component {}\n";
    let output = run(source);
    assert!(!output.changed);
    assert!(output.diagnostics.is_empty());
}

#[test]
fn unparsable_file_is_reported_and_left_alone() {
    let table = MappingTable::bundled().unwrap();
    let source = "import DS from 'ember-data';\nexport default DS.Model.extend({\n";
    let output = transform_file("broken.js", source, &table, &TransformOptions::default());
    assert!(!output.changed);
    assert_eq!(output.source, source);
    assert!(matches!(
        &output.diagnostics[..],
        [Diagnostic::TransformError { file, .. }] if file == "broken.js"
    ));
}
