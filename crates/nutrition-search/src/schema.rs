//! Index mapping and query construction

use nutrition_core::{MatchKind, SearchQuery};
use serde_json::{json, Map, Value};

fn text_with_keyword() -> Value {
    json!({
        "type": "text",
        "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
    })
}

/// Settings and mappings used when the index is created
pub fn index_body() -> Value {
    let mut properties = Map::new();
    properties.insert("id".into(), json!({ "type": "integer" }));
    properties.insert("food_cd".into(), json!({ "type": "keyword" }));
    properties.insert(
        "food_name".into(),
        json!({
            "type": "text",
            "analyzer": "standard",
            "fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
        }),
    );
    for field in ["group_name", "maker_name", "ref_name"] {
        properties.insert(field.into(), text_with_keyword());
    }
    properties.insert("research_year".into(), json!({ "type": "keyword" }));
    for field in [
        "serving_size",
        "calorie",
        "carbohydrate",
        "protein",
        "fat",
        "sugars",
        "salt",
        "cholesterol",
        "saturated_fatty_acids",
        "trans_fat",
    ] {
        properties.insert(field.into(), json!({ "type": "float" }));
    }

    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0
        },
        "mappings": { "properties": properties }
    })
}

/// Translate a search query into an ES request body
///
/// Clauses become `bool.must` entries; no clauses becomes `match_all`.
pub fn query_body(query: &SearchQuery) -> Value {
    let must: Vec<Value> = query
        .clauses()
        .into_iter()
        .map(|clause| match clause.kind {
            MatchKind::Text => json!({ "match": { (clause.field): clause.value } }),
            MatchKind::Exact => json!({ "term": { (clause.field): clause.value } }),
        })
        .collect();

    let q = if must.is_empty() {
        json!({ "match_all": {} })
    } else {
        json!({ "bool": { "must": must } })
    };

    json!({
        "query": q,
        "from": query.skip,
        "size": query.limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_field_types() {
        let body = index_body();
        let props = &body["mappings"]["properties"];
        assert_eq!(props["id"]["type"], "integer");
        assert_eq!(props["food_cd"]["type"], "keyword");
        assert_eq!(props["research_year"]["type"], "keyword");
        assert_eq!(props["food_name"]["analyzer"], "standard");
        assert_eq!(props["maker_name"]["fields"]["keyword"]["ignore_above"], 256);
        assert_eq!(props["trans_fat"]["type"], "float");
    }

    #[test]
    fn test_empty_query_is_match_all() {
        let body = query_body(&SearchQuery::default());
        assert!(body["query"]["match_all"].is_object());
        assert_eq!(body["from"], 0);
        assert_eq!(body["size"], 100);
    }

    #[test]
    fn test_clauses_become_must() {
        let query = SearchQuery::default()
            .with_food_name("rice")
            .with_research_year("2024")
            .with_food_code("D001")
            .page(10, 5);
        let body = query_body(&query);

        let must = body["query"]["bool"]["must"].as_array().unwrap();
        assert_eq!(must.len(), 3);
        assert_eq!(must[0]["match"]["food_name"], "rice");
        assert_eq!(must[1]["term"]["research_year"], "2024");
        assert_eq!(must[2]["term"]["food_cd"], "D001");
        assert_eq!(body["from"], 10);
        assert_eq!(body["size"], 5);
    }
}
