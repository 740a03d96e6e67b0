use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::repo::{Ingredient, Tag};

#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct IngredientResponse {
    pub id: i64,
    pub name: String,
}

impl From<Ingredient> for IngredientResponse {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateIngredientRequest {
    #[serde(default)]
    pub name: String,
}

/// List representation: associations as id arrays.
#[derive(Debug, Serialize)]
pub struct RecipeListItem {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub tags: Vec<i64>,
    pub ingredients: Vec<i64>,
}

/// Detail representation: associations expanded to full objects.
#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub tags: Vec<TagResponse>,
    pub ingredients: Vec<IngredientResponse>,
}

/// Body for POST and PUT. Association arrays default to empty, so a full
/// update that omits them clears the associations.
#[derive(Debug, Deserialize)]
pub struct RecipeWriteRequest {
    #[serde(default)]
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub ingredients: Vec<i64>,
}

/// Body for PATCH. `None` means "leave as is", including the association
/// sets.
#[derive(Debug, Deserialize)]
pub struct RecipePatchRequest {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<i64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_request_defaults_omitted_associations_to_empty() {
        let req: RecipeWriteRequest =
            serde_json::from_str(r#"{"title":"Cheesecake","time_minutes":5,"price":5}"#)
                .expect("deserialize");
        assert_eq!(req.title, "Cheesecake");
        assert!(req.tags.is_empty());
        assert!(req.ingredients.is_empty());
    }

    #[test]
    fn write_request_accepts_price_as_string() {
        let req: RecipeWriteRequest =
            serde_json::from_str(r#"{"title":"Soup","time_minutes":20,"price":"3.50"}"#)
                .expect("deserialize");
        assert_eq!(req.price.to_string(), "3.50");
    }

    #[test]
    fn patch_request_keeps_omitted_fields_as_none() {
        let req: RecipePatchRequest =
            serde_json::from_str(r#"{"title":"Renamed"}"#).expect("deserialize");
        assert_eq!(req.title.as_deref(), Some("Renamed"));
        assert!(req.time_minutes.is_none());
        assert!(req.tags.is_none());
        assert!(req.ingredients.is_none());
    }

    #[test]
    fn patch_request_distinguishes_empty_tags_from_omitted() {
        let req: RecipePatchRequest = serde_json::from_str(r#"{"tags":[]}"#).expect("deserialize");
        assert_eq!(req.tags, Some(vec![]));
        assert!(req.ingredients.is_none());
    }

    #[test]
    fn detail_nests_tag_objects() {
        let detail = RecipeDetail {
            id: 1,
            title: "Cheesecake".into(),
            time_minutes: 5,
            price: Decimal::new(5, 0),
            tags: vec![TagResponse {
                id: 7,
                name: "Dessert".into(),
            }],
            ingredients: vec![],
        };
        let json = serde_json::to_value(&detail).expect("serialize");
        assert_eq!(json["tags"][0]["name"], "Dessert");
        assert_eq!(json["tags"][0]["id"], 7);
    }

    #[test]
    fn list_item_renders_associations_as_id_arrays() {
        let item = RecipeListItem {
            id: 1,
            title: "Cheesecake".into(),
            time_minutes: 5,
            price: Decimal::new(5, 0),
            tags: vec![7, 9],
            ingredients: vec![3],
        };
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["tags"], serde_json::json!([7, 9]));
        assert_eq!(json["ingredients"], serde_json::json!([3]));
    }
}
