use super::*;

fn chessboard() -> Grid {
    let mut rows = vec![" ABCDEFGH".to_string()];
    for rank in (1..=8).rev() {
        let pieces: String = (0..8).map(|i| if (i + rank) % 2 == 0 { 'o' } else { '*' }).collect();
        rows.push(format!("{rank}{pieces}"));
    }
    Grid::from_chars(&rows.join("\n"))
}

const CHESS: &str = r#"
cell_types:
  letter: '[A-H]'
  digit: '[1-8]'
  piece: '[o*]'
root: document
patterns:
  letters:
    kind: array
    item: { kind: cell, content_type: letter }
    direction: row
  numbers:
    kind: array
    item: { kind: cell, content_type: digit }
    direction: column
  field:
    kind: array
    item: { kind: cell, content_type: piece }
    direction: fill
  document:
    kind: general
    count: 1
    inner:
      letters: { pattern: letters }
      numbers: { pattern: numbers }
      field: { pattern: field }
    constraints:
      - field_top == letters_bottom
      - field_left == numbers_right
"#;

fn matcher_for(yaml: &str) -> GrammarMatcher {
    let grammar = Grammar::from_yaml_str(yaml).unwrap();
    let options = grammar.options().clone();
    GrammarMatcher::new(grammar, options).unwrap()
}

#[test]
fn labelled_board_is_recognized() {
    let mut matcher = matcher_for(CHESS);
    let roots = matcher.run_match(&chessboard()).unwrap();
    assert_eq!(roots.len(), 1);

    let document = &roots[0];
    assert_eq!(document.rect, Rect::new(0, 0, 9, 9));
    assert_eq!(document.precision(), 1.0);

    let letters = document.component("letters").unwrap();
    assert_eq!(letters.text(), "ABCDEFGH");
    assert_eq!(letters.rect, Rect::new(1, 0, 8, 1));

    let numbers = document.component("numbers").unwrap();
    let expected: Vec<String> = (1..=8).rev().map(|n| n.to_string()).collect();
    assert_eq!(numbers.content(), expected);

    let field = document.component("field").unwrap();
    assert_eq!(field.rect, Rect::new(1, 1, 8, 8));
    assert_eq!(field.items().len(), 64);
    assert_eq!(matcher.get_pattern_matches("field", None).len(), 1);
}

#[test]
fn metrics_follow_the_waves() {
    let mut matcher = matcher_for(CHESS);
    let run = matcher.run_with_metrics(&chessboard()).unwrap();
    assert_eq!(run.roots.len(), 1);
    assert_eq!(run.metrics.waves.len(), 3);
    let per_wave: Vec<usize> = run.metrics.waves.iter().map(|w| w.produced).collect();
    assert_eq!(per_wave, vec![80, 3, 1]);
    assert_eq!(run.metrics.produced(), 84);
    assert_eq!(matcher.registry().len(), 84);
}

#[test]
fn board_without_a_field_has_no_document() {
    let mut matcher = matcher_for(CHESS);
    let grid = Grid::from_chars(" ABCDEFGH\n8\n7\n6\n5\n4\n3\n2\n1");
    assert!(matcher.run_match(&grid).unwrap().is_empty());
    assert_eq!(matcher.get_pattern_matches("numbers", None).len(), 1);
}

const PAIRS: &str = r#"
cell_types:
  word: '[a-z]+'
  number: '[0-9]+'
root: pair
options:
  cutoff_ratio: 0.0
patterns:
  label: { kind: cell, content_type: word }
  value: { kind: cell, content_type: number }
  pair:
    kind: general
    inner:
      label: { pattern: label }
      value: { pattern: value, count: "0..1" }
    constraints:
      - value_left == label_right
      - value_top == label_top
"#;

#[test]
fn optional_components_may_stay_unbound() {
    let grid = Grid::from_delimited("x,1\ny,\n", ',');
    let mut matcher = matcher_for(PAIRS);
    let pairs = matcher.run_match(&grid).unwrap();
    assert_eq!(pairs.len(), 2);

    assert_eq!(pairs[0].text(), "x1");
    assert_eq!(pairs[0].precision(), 1.0);
    assert_eq!(pairs[1].text(), "y");
    assert!(pairs[1].component("value").is_none());
    assert_eq!(pairs[1].precision(), 0.5);

    // the default cutoff drops partial chains far behind the best one
    let grammar = Grammar::from_yaml_str(PAIRS).unwrap();
    let mut strict = GrammarMatcher::new(grammar, Options::default()).unwrap();
    let pairs = strict.run_match(&grid).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].text(), "x1");
}

#[test]
fn overlapping_candidates_are_arbitrated() {
    // "a b" and "b c" both want the middle cell
    let yaml = r#"
cell_types:
  word: '[a-z]'
root: duo
patterns:
  w: { kind: cell, content_type: word }
  duo:
    kind: general
    inner:
      first: { pattern: w }
      second: { pattern: w }
    constraints:
      - second_left == first_right
      - second_top == first_top
"#;
    let mut matcher = matcher_for(yaml);
    let found = matcher.run_match(&Grid::from_chars("abc")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].text(), "ab");
}

const TABLES: &str = r#"
cell_types:
  word: '[A-Za-z]+'
  number: '[0-9]+'
root: table
patterns:
  title: { kind: cell, content_type: word }
  body:
    kind: array
    item: { kind: cell, content_type: number }
    direction: fill
  table:
    kind: area
    inner:
      body: { pattern: body }
    outer:
      title: { pattern: title, outside: top }
"#;

#[test]
fn area_binds_floating_outer_components() {
    let grid = Grid::from_delimited("Prices,\n12,34\n56,78\nNotes,\n", ',');
    let mut matcher = matcher_for(TABLES);
    let tables = matcher.run_match(&grid).unwrap();
    assert_eq!(tables.len(), 1);

    let table = &tables[0];
    assert_eq!(table.rect, Rect::new(0, 1, 2, 2));
    assert_eq!(table.component("title").unwrap().text(), "Prices");
    assert_eq!(table.component("body").unwrap().content(), vec!["12", "34", "56", "78"]);
    assert!(table.points().contains(&Point::new(0, 0)));
}

#[test]
fn cell_patterns_respect_the_precision_threshold() {
    let yaml = "cell_types: { code: '[A-Z]{2}' }\nroot: c\npatterns:\n  c: { kind: cell, content_type: code }\n";
    let grid = Grid::from_delimited("AB,ABCD,x", ',');

    let mut lenient = matcher_for(yaml);
    assert_eq!(lenient.run_match(&grid).unwrap().len(), 2);

    let grammar = Grammar::from_yaml_str(yaml).unwrap();
    let options = Options { precision_threshold: 0.75, ..Options::default() };
    let mut strict = GrammarMatcher::new(grammar, options).unwrap();
    let found = strict.run_match(&grid).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].text(), "AB");
}

#[test]
fn document_counts_truncate_extra_matches() {
    let yaml = "cell_types: { d: '[0-9]' }\nroot: c\npatterns:\n  c: { kind: cell, content_type: d, count: '0..2' }\n";
    let mut matcher = matcher_for(yaml);
    let found = matcher.run_match(&Grid::from_chars("1234")).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].rect, Rect::cell(0, 0));
}

const LISTS: &str = r#"
cell_types:
  word: '[a-z]+'
  number: '[0-9]+'
root: list
patterns:
  label: { kind: cell, content_type: word }
  value: { kind: cell, content_type: number }
  list:
    kind: general
    inner:
      label: { pattern: label }
      values: { pattern: value, count: "1..3" }
    constraints:
      - values_top == label_top
      - values_left >= label_right
"#;

#[test]
fn repeated_components_bind_several_matches() {
    let grid = Grid::from_delimited("x,1,2,3,4\ny,,,,\n", ',');
    let mut matcher = matcher_for(LISTS);
    let lists = matcher.run_match(&grid).unwrap();
    assert_eq!(lists.len(), 1);

    let list = &lists[0];
    assert_eq!(list.text(), "x123");
    let values: Vec<Rect> = list.component_matches("values").iter().map(|m| m.rect).collect();
    assert_eq!(values, vec![Rect::cell(1, 0), Rect::cell(2, 0), Rect::cell(3, 0)]);
    assert_eq!(list.component("values").unwrap().rect, Rect::cell(1, 0));
    assert_eq!(list.precision(), 1.0);

    // a constraint on a repeated component holds for every member
    let adjacent = LISTS.replace("values_left >= label_right", "values_left == label_right");
    let mut matcher = matcher_for(&adjacent);
    let lists = matcher.run_match(&grid).unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].text(), "x1");
}

fn place(registry: &mut MatchRegistry, pattern: &str, rect: Rect, text: &str, confidence: f64) {
    registry.register(Arc::new(Match::cell(pattern, rect, text, pattern, confidence)), &[]);
}

fn area_matches(yaml: &str, registry: &MatchRegistry, options: &Options) -> Vec<Arc<Match>> {
    let grammar = Grammar::from_yaml_str(yaml).unwrap();
    let ctx = MatchContext { grammar: &grammar, registry, options, cells: &[] };
    let mut found = AreaMatcher::new(grammar.root(), ctx).find_all(None).unwrap();
    found.sort_by_key(|m| (m.rect.top(), m.rect.left()));
    found
}

const NOTED: &str = r#"
cell_types:
  word: '[a-z]+'
root: noted
patterns:
  body: { kind: cell, content_type: word }
  note: { kind: cell, content_type: word }
  noted:
    kind: area
    inner:
      body: { pattern: body }
    outer:
      note: { pattern: note, outside: "top: 0..5" }
"#;

#[test]
fn area_tries_candidates_one_cell_past_the_nearest() {
    let mut registry = MatchRegistry::new();
    place(&mut registry, "body", Rect::new(0, 5, 2, 1), "ab", 1.0);
    place(&mut registry, "note", Rect::cell(0, 4), "touching", 0.25);
    place(&mut registry, "note", Rect::cell(0, 3), "spaced", 0.5);
    place(&mut registry, "note", Rect::cell(1, 0), "far", 1.0);

    let found = area_matches(NOTED, &registry, &Options::default());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].rect, Rect::new(0, 5, 2, 1));
    assert_eq!(found[0].component("note").unwrap().text(), "spaced");
    assert_eq!(found[0].precision(), 0.75);
}

#[test]
fn area_keeps_equally_near_candidates() {
    let yaml = r#"
cell_types:
  word: '[a-z]+'
root: noted
patterns:
  body: { kind: cell, content_type: word }
  note: { kind: cell, content_type: word }
  mark: { kind: cell, content_type: word }
  noted:
    kind: area
    inner:
      body: { pattern: body }
    outer:
      note: { pattern: note, outside: "top: 0..5" }
      mark: { pattern: mark, outside: bottom }
    constraints:
      - mark_left == note_left
"#;
    let mut registry = MatchRegistry::new();
    place(&mut registry, "body", Rect::new(0, 5, 2, 1), "ab", 1.0);
    // both notes sit one row above the body; only the weaker one has a mark below
    place(&mut registry, "note", Rect::cell(0, 3), "strong", 1.0);
    place(&mut registry, "note", Rect::cell(1, 3), "weak", 0.5);
    place(&mut registry, "note", Rect::cell(0, 0), "far", 1.0);
    place(&mut registry, "mark", Rect::cell(1, 6), "m", 1.0);
    for x in 5..8 {
        place(&mut registry, "mark", Rect::cell(x, 9), "m", 1.0);
    }

    let found = area_matches(yaml, &registry, &Options::default());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].component("note").unwrap().text(), "weak");
    assert_eq!(found[0].component("mark").unwrap().rect, Rect::cell(1, 6));
}

#[test]
fn area_result_budget_applies_per_entry_point() {
    let mut registry = MatchRegistry::new();
    place(&mut registry, "body", Rect::new(0, 5, 2, 1), "ab", 1.0);
    place(&mut registry, "body", Rect::new(5, 5, 2, 1), "cd", 1.0);
    place(&mut registry, "note", Rect::cell(0, 4), "touching", 0.25);
    place(&mut registry, "note", Rect::cell(0, 3), "spaced", 0.5);
    place(&mut registry, "note", Rect::cell(5, 4), "other", 1.0);

    let options = Options { max_area_results: 1, ..Options::default() };
    let found = area_matches(NOTED, &registry, &options);
    let notes: Vec<String> = found.iter().map(|m| m.component("note").unwrap().text()).collect();
    assert_eq!(notes, vec!["touching", "other"]);

    let found = area_matches(NOTED, &registry, &Options::default());
    let notes: Vec<String> = found.iter().map(|m| m.component("note").unwrap().text()).collect();
    assert_eq!(notes, vec!["spaced", "other"]);
}

#[test]
fn area_repeated_components_take_the_nearest() {
    let yaml = NOTED.replace(r#"outside: "top: 0..5" }"#, r#"outside: "top: 0..5", count: "1..2" }"#);
    let mut registry = MatchRegistry::new();
    place(&mut registry, "body", Rect::new(0, 5, 2, 1), "ab", 1.0);
    place(&mut registry, "note", Rect::cell(0, 2), "c", 1.0);
    place(&mut registry, "note", Rect::cell(0, 4), "a", 1.0);
    place(&mut registry, "note", Rect::cell(1, 4), "b", 1.0);

    let found = area_matches(&yaml, &registry, &Options::default());
    assert_eq!(found.len(), 1);
    let notes: Vec<Rect> = found[0].component_matches("note").iter().map(|m| m.rect).collect();
    assert_eq!(notes, vec![Rect::cell(0, 4), Rect::cell(1, 4)]);
}

#[test]
fn area_rematches_arrays_against_the_bound_range() {
    let yaml = r#"
cell_types:
  word: '[a-z]+'
  number: '[0-9]+'
root: table
patterns:
  header: { kind: cell, content_type: word }
  num: { kind: cell, content_type: number }
  column:
    kind: array-in-context
    item: num
    direction: column
    item_count: "1..3"
  table:
    kind: area
    inner:
      header: { pattern: header, inside: "left, top, right" }
      column: { pattern: column }
"#;
    let mut registry = MatchRegistry::new();
    place(&mut registry, "header", Rect::new(0, 0, 3, 1), "abc", 1.0);
    let mut nums = Vec::new();
    for y in 1..=5 {
        let num = Arc::new(Match::cell("num", Rect::cell(0, y), y.to_string(), "num", 1.0));
        registry.register(Arc::clone(&num), &[]);
        nums.push(num);
    }
    place(&mut registry, "num", Rect::cell(5, 2), "9", 1.0);
    // an earlier, context-free match of the column
    registry.register(Arc::new(Match::array("column", nums[2..].to_vec())), &[]);

    let found = area_matches(yaml, &registry, &Options::default());
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].rect, Rect::new(0, 0, 3, 4));
    let column = found[0].component("column").unwrap();
    assert_eq!(column.rect, Rect::new(0, 1, 1, 3));
    assert_eq!(column.content(), vec!["1", "2", "3"]);
}
