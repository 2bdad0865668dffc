// Collection-group matching: every collection sharing a name, at any depth.

use crate::error::{ArborDbError, Result};
use crate::schema::{CollectionSchema, DocumentSchema, SchemaDefinition};
use std::collections::HashMap;

/// One collection matched by a group query, with the full path where it
/// was found (alternating collection/document segments).
#[derive(Debug, Clone)]
pub struct GroupMatch<'a> {
    pub path: Vec<String>,
    pub schema: &'a CollectionSchema,
}

impl<'a> GroupMatch<'a> {
    pub fn path_string(&self) -> String {
        self.path.join("/")
    }
}

/// Find every collection named `name`, at any depth in the schema tree.
///
/// `name` must be a bare collection name; an embedded `/` is the same
/// malformed-path error the path parser raises. The scan is exhaustive,
/// with no early termination, and the result is a union, possibly empty.
pub fn find_collection_group<'a>(
    schema: &'a SchemaDefinition,
    name: &str,
) -> Result<Vec<GroupMatch<'a>>> {
    if name.contains('/') {
        return Err(ArborDbError::MalformedSegment {
            segment: name.to_string(),
        });
    }
    if name.is_empty() {
        return Err(ArborDbError::EmptySegment {
            path: name.to_string(),
        });
    }

    let mut matches = Vec::new();
    walk_tree(&schema.collections, name, &mut Vec::new(), &mut matches);
    Ok(matches)
}

/// The union of every matched collection's document schemas.
pub fn group_document_schemas<'a>(
    schema: &'a SchemaDefinition,
    name: &str,
) -> Result<Vec<&'a DocumentSchema>> {
    let matches = find_collection_group(schema, name)?;
    Ok(matches
        .iter()
        .flat_map(|m| m.schema.documents.values())
        .collect())
}

fn walk_tree<'a>(
    tree: &'a HashMap<String, CollectionSchema>,
    name: &str,
    path: &mut Vec<String>,
    out: &mut Vec<GroupMatch<'a>>,
) {
    for (key, collection) in tree {
        path.push(key.clone());
        if key == name {
            out.push(GroupMatch {
                path: path.clone(),
                schema: collection,
            });
        }
        // Keep descending regardless of a match here; deeper collections
        // may carry the same name.
        for (doc_key, document) in &collection.documents {
            path.push(doc_key.clone());
            walk_tree(&document.collections, name, path, out);
            path.pop();
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema_str;
    use std::collections::BTreeSet;

    fn forum_schema() -> SchemaDefinition {
        parse_schema_str(
            r#"
collections:
  posts:
    documents:
      "{postId}":
        fields:
          title: { type: string }
        collections:
          comments:
            documents:
              "{commentId}":
                fields:
                  body: { type: string }
  wiki:
    documents:
      "{pageId}":
        collections:
          revisions:
            documents:
              "{revId}":
                collections:
                  comments:
                    documents:
                      "{commentId}":
                        fields:
                          note: { type: string }
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_matches_at_multiple_depths() {
        let schema = forum_schema();
        let matches = find_collection_group(&schema, "comments").unwrap();
        assert_eq!(matches.len(), 2);

        let paths: BTreeSet<String> =
            matches.iter().map(|m| m.path_string()).collect();
        assert!(paths.contains("posts/{postId}/comments"));
        assert!(paths.contains("wiki/{pageId}/revisions/{revId}/comments"));
    }

    #[test]
    fn test_union_of_document_schemas() {
        let schema = forum_schema();
        let documents = group_document_schemas(&schema, "comments").unwrap();
        assert_eq!(documents.len(), 2);

        let fields: BTreeSet<&str> = documents
            .iter()
            .flat_map(|d| d.fields.keys().map(|k| k.as_str()))
            .collect();
        assert!(fields.contains("body"));
        assert!(fields.contains("note"));
    }

    #[test]
    fn test_top_level_name_also_matches() {
        let schema = forum_schema();
        let matches = find_collection_group(&schema, "posts").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].path_string(), "posts");
    }

    #[test]
    fn test_no_match_is_empty() {
        let schema = forum_schema();
        assert!(find_collection_group(&schema, "likes").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_slash_in_name() {
        let schema = forum_schema();
        let err = find_collection_group(&schema, "posts/comments").unwrap_err();
        assert!(matches!(err, ArborDbError::MalformedSegment { .. }));
    }

    #[test]
    fn test_rejects_empty_name() {
        let schema = forum_schema();
        assert!(find_collection_group(&schema, "").is_err());
    }

    #[test]
    fn test_same_name_at_depths_one_and_three() {
        let schema = parse_schema_str(
            r#"
collections:
  posts:
    documents:
      "{postId}":
        collections:
          replies:
            documents:
              "{replyId}":
                collections:
                  posts:
                    documents:
                      "{nestedId}": {}
"#,
        )
        .unwrap();
        let matches = find_collection_group(&schema, "posts").unwrap();
        assert_eq!(matches.len(), 2);
    }
}
