use arbordb::group::find_collection_group;
use arbordb::path::{expect_kind, split_path, PathKind};
use arbordb::resolve::{resolve_path, SchemaNode};
use arbordb::schema::{
    hash_schema, parse_schema_str, CollectionSchema, FieldType, SchemaDefinition,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::process;

/// ArborDB CLI for inspecting and linting a document-store schema
#[derive(Parser)]
#[command(name = "arbordb", version, about)]
struct Cli {
    /// Path to the schema file
    #[arg(long, default_value = "schema.yaml")]
    schema: String,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Expect {
    Collection,
    Document,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a slash-delimited path (wildcards allowed) against the schema
    Resolve {
        /// The path to resolve, e.g. users/{uid}/posts
        path: String,
        /// Treat wildcard segments as non-matching
        #[arg(long)]
        no_wildcards: bool,
        /// Require the path to address a collection or a document
        #[arg(long)]
        expect: Option<Expect>,
    },

    /// Find every collection with the given name, at any depth
    Group {
        /// Bare collection name (no slashes)
        name: String,
    },

    /// Check the schema for structural problems
    Validate,

    /// Show schema fingerprint and tree statistics
    Status,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(&cli.schema)?;
    let schema = parse_schema_str(&content)?;

    match cli.command {
        Command::Resolve {
            path,
            no_wildcards,
            expect,
        } => {
            let segments = split_path(&path)?;
            if let Some(expect) = expect {
                let kind = match expect {
                    Expect::Collection => PathKind::Collection,
                    Expect::Document => PathKind::Document,
                };
                expect_kind(&segments, kind, &path)?;
            }

            let resolution = resolve_path(&schema, &segments, !no_wildcards);
            if resolution.is_empty() {
                return Err(format!("path '{path}' matches nothing in the schema").into());
            }

            let matches: Vec<serde_json::Value> = resolution
                .matches
                .iter()
                .map(|node| {
                    serde_json::json!({
                        "kind": node_kind(node),
                        "schema": node,
                    })
                })
                .collect();
            print_output(&serde_json::json!({ "path": path, "matches": matches }), &cli.format);
        }

        Command::Group { name } => {
            let matches = find_collection_group(&schema, &name)?;
            if matches.is_empty() {
                return Err(format!("no collection named '{name}' anywhere in the schema").into());
            }

            let entries: Vec<serde_json::Value> = matches
                .iter()
                .map(|m| {
                    serde_json::json!({
                        "path": m.path_string(),
                        "documents": m.schema.documents,
                    })
                })
                .collect();
            print_output(&serde_json::json!({ "group": name, "matches": entries }), &cli.format);
        }

        Command::Validate => {
            // Parsing already ran structural verification; add the lints
            // that need whole-tree context.
            let warnings = lint_schema(&schema);
            let ok = warnings.is_empty();
            print_output(
                &serde_json::json!({
                    "ok": ok,
                    "collections": schema.collections.len(),
                    "warnings": warnings,
                }),
                &cli.format,
            );
            if !ok {
                process::exit(1);
            }
        }

        Command::Status => {
            let stats = tree_stats(&schema);
            print_output(
                &serde_json::json!({
                    "schema_hash": hash_schema(&content),
                    "collections": stats.collections,
                    "documents": stats.documents,
                    "max_depth": stats.max_depth,
                }),
                &cli.format,
            );
        }
    }

    Ok(())
}

fn node_kind(node: &SchemaNode<'_>) -> &'static str {
    match node {
        SchemaNode::Root(_) => "root",
        SchemaNode::Collection(_) => "collection",
        SchemaNode::Document(_) => "document",
    }
}

/// Whole-tree lints: every reference target must name a collection that
/// exists somewhere in the tree.
fn lint_schema(schema: &SchemaDefinition) -> Vec<String> {
    let mut warnings = Vec::new();
    walk_collections(&schema.collections, "", &mut |path, collection| {
        for (doc_key, document) in &collection.documents {
            for (field_name, field) in &document.fields {
                if field.field_type != FieldType::Reference {
                    continue;
                }
                let Some(target) = &field.target else { continue };
                for name in target.targets() {
                    let found = find_collection_group(schema, name)
                        .map(|m| !m.is_empty())
                        .unwrap_or(false);
                    if !found {
                        warnings.push(format!(
                            "{path}/{doc_key}.{field_name}: reference target '{name}' does not name any collection"
                        ));
                    }
                }
            }
        }
    });
    warnings.sort();
    warnings
}

struct TreeStats {
    collections: usize,
    documents: usize,
    max_depth: usize,
}

fn tree_stats(schema: &SchemaDefinition) -> TreeStats {
    let mut stats = TreeStats {
        collections: 0,
        documents: 0,
        max_depth: 0,
    };
    count_tree(&schema.collections, 1, &mut stats);
    stats
}

fn count_tree(tree: &HashMap<String, CollectionSchema>, depth: usize, stats: &mut TreeStats) {
    for collection in tree.values() {
        stats.collections += 1;
        stats.max_depth = stats.max_depth.max(depth);
        stats.documents += collection.documents.len();
        for document in collection.documents.values() {
            count_tree(&document.collections, depth + 1, stats);
        }
    }
}

fn walk_collections(
    tree: &HashMap<String, CollectionSchema>,
    prefix: &str,
    visit: &mut impl FnMut(&str, &CollectionSchema),
) {
    for (name, collection) in tree {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        visit(&path, collection);
        for (doc_key, document) in &collection.documents {
            let doc_path = format!("{path}/{doc_key}");
            walk_collections(&document.collections, &doc_path, visit);
        }
    }
}

fn print_output(value: &serde_json::Value, format: &OutputFormat) {
    match format {
        OutputFormat::Yaml => {
            match serde_yaml::to_string(value) {
                Ok(yaml) => print!("{yaml}"),
                Err(_) => println!("{value}"),
            }
        }
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(_) => println!("{value}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
collections:
  posts:
    documents:
      "{postId}":
        fields:
          author: { type: reference, target: users }
        collections:
          comments:
            documents:
              "{commentId}": {}
"#;

    #[test]
    fn test_lint_flags_dangling_reference_target() {
        let schema = parse_schema_str(SCHEMA).unwrap();
        let warnings = lint_schema(&schema);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("users"));
    }

    #[test]
    fn test_tree_stats() {
        let schema = parse_schema_str(SCHEMA).unwrap();
        let stats = tree_stats(&schema);
        assert_eq!(stats.collections, 2);
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.max_depth, 2);
    }
}
