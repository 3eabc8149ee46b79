use movie_import::core::field_parsers::{
    parse_cast_names, parse_cast_objects, parse_date, parse_list_field, parse_money,
    parse_production_companies,
};
use serde_json::json;

// 實際匯出檔中出現過的各種寫法
const MESSY_INPUTS: &[&str] = &[
    "",
    "   ",
    "[]",
    "[",
    "]",
    "[[[",
    "{}",
    "{\"name\":",
    ",,,",
    "; ; ;",
    "||",
    "null",
    "[null, 1, true]",
    "[{\"id\": 3}]",
    "Marvel Studios, Disney",
    "[Warner Bros. Pictures & Co.]",
    "Tom Hanks as Forrest, Robin Wright as Jenny",
    "as as as",
    "Ünïcödé Fïlms",
];

#[test]
fn test_parsers_never_panic_on_messy_input() {
    for input in MESSY_INPUTS {
        let _ = parse_production_companies(*input);
        let _ = parse_cast_names(*input);
        let _ = parse_cast_objects(*input);
        let _ = parse_list_field(Some(input));
        let _ = parse_date(Some(input));
        assert_eq!(parse_money(Some(input)), 0, "input {:?}", input);
    }
}

#[test]
fn test_parsed_names_are_trimmed_and_non_empty() {
    for input in MESSY_INPUTS {
        let companies = parse_production_companies(*input);
        assert!(
            companies.iter().all(|c| !c.name.is_empty() && c.name.trim() == c.name),
            "companies from {:?}: {:?}",
            input,
            companies
        );

        let cast = parse_cast_names(*input);
        assert!(
            cast.iter().all(|name| !name.is_empty() && name.trim() == name),
            "cast from {:?}: {:?}",
            input,
            cast
        );
    }
}

#[test]
fn test_cast_objects_mirror_cast_names() {
    for input in MESSY_INPUTS {
        let names = parse_cast_names(*input);
        let objects: Vec<String> = parse_cast_objects(*input)
            .into_iter()
            .map(|member| member.name)
            .collect();
        assert_eq!(names, objects, "input {:?}", input);
    }
}

#[test]
fn test_blank_input_yields_empty_lists() {
    for input in ["", "  ", "\t"] {
        assert!(parse_production_companies(input).is_empty());
        assert!(parse_cast_names(input).is_empty());
        assert!(parse_list_field(Some(input)).is_empty());
    }
    assert!(parse_production_companies(None::<&str>).is_empty());
    assert!(parse_list_field(None).is_empty());
}

#[test]
fn test_structured_values_are_accepted() {
    let companies = parse_production_companies(json!([
        {"name": "Pixar", "id": 3},
        "Walt Disney Pictures"
    ]));
    assert_eq!(companies.len(), 2);
    assert_eq!(companies[0].name, "Pixar");
    assert_eq!(companies[0].id, Some(3));
    assert_eq!(companies[1].name, "Walt Disney Pictures");

    let cast = parse_cast_names(json!([{"name": "Tom Hanks"}, {"character": "Woody"}]));
    assert_eq!(cast, vec!["Tom Hanks", "Unknown Actor"]);
}
