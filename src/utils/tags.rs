//! Label normalization shared by tagging and search.
//!
//! Tags are stored lowercase and singular so that a search for "cats" finds an
//! image labelled "Cat" and vice versa.

use inflector::string::singularize::to_singular;

/// S3 accepts at most 10 tags per object
pub const MAX_TAGS: usize = 10;

/// Lowercase and singularize a single label or keyword. For multi-word labels
/// such as "Christmas Trees" only the last word is singularized.
pub fn normalize_tag(label: &str) -> String {
    let lowered = label.trim().to_lowercase();
    let mut words: Vec<&str> = lowered.split_whitespace().collect();
    let Some(last) = words.pop() else {
        return String::new();
    };

    let singular = singular_word(last);
    if words.is_empty() {
        singular
    } else {
        format!("{} {}", words.join(" "), singular)
    }
}

fn singular_word(word: &str) -> String {
    if is_invariant(word) || is_irregular_singular(word) {
        return word.to_string();
    }
    match irregular_plural(word) {
        Some(singular) => singular.to_string(),
        None => to_singular(word),
    }
}

/// Words whose plural and singular coincide, or which only look plural
fn is_invariant(word: &str) -> bool {
    word.ends_with("ss")
        || matches!(
            word,
            "is" | "this" | "his" | "has" | "was" | "does" | "its" | "yes" | "us" | "plus"
                | "thus" | "always" | "news" | "series" | "species" | "means"
                | "gas" | "canvas" | "atlas" | "christmas" | "lens" | "iris" | "tennis"
                | "analysis" | "basis" | "crisis" | "axis" | "oasis" | "thesis"
                | "bus" | "cactus" | "virus" | "status" | "octopus" | "fungus" | "campus"
                | "circus" | "bonus" | "census" | "hippopotamus" | "asparagus" | "citrus"
                | "walrus" | "platypus" | "focus" | "genus" | "chorus" | "lotus"
                | "eucalyptus" | "hibiscus" | "crocus" | "nautilus" | "abacus" | "cumulus"
                | "apparatus" | "sheep" | "fish" | "deer" | "moose" | "bison" | "salmon"
                | "trout" | "shrimp" | "aircraft" | "spacecraft" | "equipment" | "furniture"
                | "clothing" | "glasses" | "sunglasses" | "goggles" | "binoculars"
                | "scissors" | "pants" | "shorts" | "jeans" | "trousers" | "electronics"
                | "athletics" | "gymnastics" | "mathematics" | "physics" | "politics"
        )
}

fn irregular_plural(word: &str) -> Option<&'static str> {
    let singular = match word {
        "people" => "person",
        "children" => "child",
        "men" => "man",
        "women" => "woman",
        "mice" => "mouse",
        "geese" => "goose",
        "feet" => "foot",
        "teeth" => "tooth",
        "oxen" => "ox",
        "cacti" | "cactuses" => "cactus",
        "fungi" => "fungus",
        "octopi" | "octopuses" => "octopus",
        "leaves" => "leaf",
        "knives" => "knife",
        "wolves" => "wolf",
        "lives" => "life",
        "wives" => "wife",
        "halves" => "half",
        "shelves" => "shelf",
        "calves" => "calf",
        "loaves" => "loaf",
        "thieves" => "thief",
        "scarves" => "scarf",
        "elves" => "elf",
        "hooves" => "hoof",
        "criteria" => "criterion",
        "phenomena" => "phenomenon",
        "indices" => "index",
        "vertices" => "vertex",
        "matrices" => "matrix",
        "analyses" => "analysis",
        "crises" => "crisis",
        "theses" => "thesis",
        "buses" => "bus",
        "gases" => "gas",
        "lenses" => "lens",
        "canvases" => "canvas",
        "atlases" => "atlas",
        "viruses" => "virus",
        "statuses" => "status",
        "firemen" => "fireman",
        "policemen" => "policeman",
        "fishermen" => "fisherman",
        "businessmen" => "businessman",
        _ => return None,
    };
    Some(singular)
}

fn is_irregular_singular(word: &str) -> bool {
    matches!(
        word,
        "person" | "child" | "man" | "woman" | "mouse" | "goose" | "foot" | "tooth" | "ox"
            | "leaf" | "knife" | "wolf" | "life" | "wife" | "half" | "shelf" | "calf"
            | "loaf" | "thief" | "scarf" | "elf" | "hoof" | "criterion" | "phenomenon"
            | "index" | "vertex" | "matrix" | "fireman" | "policeman" | "fisherman"
            | "businessman"
    )
}

/// Normalize detector output into a tag set, keeping first-seen order
pub fn normalize_labels<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tags: Vec<String> = Vec::new();
    for label in labels {
        let tag = normalize_tag(label.as_ref());
        if tag.is_empty() || tags.contains(&tag) {
            continue;
        }
        tags.push(tag);
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    tags
}

/// Split a free-text query into singular keywords
pub fn query_keywords(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(normalize_tag)
        .filter(|k| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tag_singularizes() {
        assert_eq!(normalize_tag("Cats"), "cat");
        assert_eq!(normalize_tag("dog"), "dog");
        assert_eq!(normalize_tag("  Dogs "), "dog");
    }

    #[test]
    fn test_words_that_only_look_plural_are_kept() {
        for word in ["gas", "lens", "canvas", "cactus", "is", "glass", "series", "news"] {
            assert_eq!(normalize_tag(word), word);
        }
    }

    #[test]
    fn test_irregular_plurals() {
        assert_eq!(normalize_tag("Leaves"), "leaf");
        assert_eq!(normalize_tag("people"), "person");
        assert_eq!(normalize_tag("Children"), "child");
        assert_eq!(normalize_tag("knives"), "knife");
        assert_eq!(normalize_tag("cacti"), "cactus");
        assert_eq!(normalize_tag("lenses"), "lens");
        assert_eq!(normalize_tag("leaf"), "leaf");
        assert_eq!(normalize_tag("person"), "person");
    }

    #[test]
    fn test_multi_word_labels_singularize_last_word() {
        assert_eq!(normalize_tag("Christmas  Trees"), "christmas tree");
        assert_eq!(normalize_tag("Palm Tree"), "palm tree");
    }

    #[test]
    fn test_plural_keywords_meet_singular_tags() {
        let tags = normalize_labels(["Leaf", "Person", "Gas"]);
        assert_eq!(tags, vec!["leaf", "person", "gas"]);
        assert_eq!(query_keywords("leaves people gases"), tags);
    }

    #[test]
    fn test_normalize_labels_dedups_after_singularizing() {
        let tags = normalize_labels(["Cat", "Cats", "Animal", "Pet"]);
        assert_eq!(tags, vec!["cat", "animal", "pet"]);
    }

    #[test]
    fn test_normalize_labels_caps_tag_count() {
        let labels: Vec<String> = (0..15).map(|i| format!("label{i}")).collect();
        assert_eq!(normalize_labels(&labels).len(), MAX_TAGS);
    }

    #[test]
    fn test_query_keywords() {
        assert_eq!(query_keywords("  black   Cats "), vec!["black", "cat"]);
        assert!(query_keywords("   ").is_empty());
    }
}
