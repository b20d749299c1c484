//! Unit tests for markup-to-descriptor translation

use docsync::markup::translate;
use docsync::{BlockType, StyledRun};

#[test]
fn test_line_rules_pick_the_right_block_types() {
    let descriptors = translate(
        "# One\n\
         ### Three\n\
         - bullet\n\
         3. ordered\n\
         > quoted\n\
         - [ ] open\n\
         - [x] done\n\
         ---\n\
         plain tail",
    );

    let types: Vec<BlockType> = descriptors.iter().map(|d| d.block_type).collect();
    assert_eq!(
        types,
        vec![
            BlockType::Heading1,
            BlockType::Heading3,
            BlockType::Bullet,
            BlockType::Ordered,
            BlockType::Quote,
            BlockType::Todo,
            BlockType::Todo,
            BlockType::Divider,
            BlockType::Text,
        ]
    );
    assert!(!descriptors[5].checked);
    assert!(descriptors[6].checked);
}

#[test]
fn test_deep_heading_prefixes_match_longest_first() {
    let descriptors = translate("######### Nine\n## Two");
    assert_eq!(descriptors[0].block_type, BlockType::Heading9);
    assert_eq!(descriptors[1].block_type, BlockType::Heading2);
}

#[test]
fn test_marker_without_space_is_a_paragraph() {
    for line in ["#heading", "-bullet", ">quote", "1.ordered"] {
        let descriptors = translate(line);
        assert_eq!(descriptors.len(), 1, "{line}");
        assert_eq!(descriptors[0].block_type, BlockType::Text, "{line}");
    }
}

#[test]
fn test_inline_styles_split_into_runs() {
    let descriptors = translate("a **b** *c* ~~d~~ `e` [f](https://g.test)");
    let runs = &descriptors[0].runs;

    assert_eq!(runs.len(), 10);
    assert_eq!(runs[0], StyledRun::plain("a "));
    assert!(runs[1].bold);
    assert!(runs[3].italic);
    assert!(runs[5].strikethrough);
    assert!(runs[7].inline_code);
    assert_eq!(runs[9].link.as_deref(), Some("https://g.test"));
    assert_eq!(runs[9].text, "f");
}

#[test]
fn test_styles_apply_inside_list_items() {
    let descriptors = translate("- has **bold** inside");
    assert_eq!(descriptors[0].block_type, BlockType::Bullet);
    assert!(descriptors[0].runs.iter().any(|run| run.bold));
}

#[test]
fn test_fence_interior_is_never_pattern_matched() {
    let descriptors = translate("```bash\n# not a heading\n- not a bullet\n```");
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].block_type, BlockType::Code);

    let source: String = descriptors[0].runs.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(source, "# not a heading\n- not a bullet");
}

#[test]
fn test_unterminated_fence_is_flushed() {
    let descriptors = translate("```rust\nlet x = 1;");
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].block_type, BlockType::Code);
}

#[test]
fn test_blank_lines_produce_no_blocks() {
    assert!(translate("\n\n   \n").is_empty());
    assert_eq!(translate("a\n\nb").len(), 2);
}

#[test]
fn test_empty_input_translates_to_nothing() {
    assert!(translate("").is_empty());
}
