//! Built-in curriculum and rank table.
//!
//! These guarantee the app is useful without any external config. A TOML bank
//! (see `config.rs`) replaces the curriculum when present.

use crate::config::{compile_bank, ChallengeCfg, ContractKind, PitfallCfg};
use crate::domain::{Challenge, Specialization, Tier};
use crate::progress::RankThreshold;

pub fn default_ranks() -> Vec<RankThreshold> {
  [
    ("Curious Beginner", 0),
    ("Aspiring Coder", 200),
    ("Logic Explorer", 600),
    ("Python Friend", 1200),
    ("Code Architect", 2500),
    ("Syntax Sage", 4000),
  ]
  .into_iter()
  .map(|(rank, min_xp)| RankThreshold { rank: rank.into(), min_xp })
  .collect()
}

#[allow(clippy::too_many_arguments)]
fn local(
  id: &str,
  tier: Tier,
  title: &str,
  description: &str,
  points: u32,
  initial_code: &str,
  solution: &str,
  concepts: &[&str],
  success: (&str, &str),
  hint: &str,
  pitfalls: Vec<PitfallCfg>,
) -> ChallengeCfg {
  ChallengeCfg {
    id: id.into(),
    tier,
    path: Specialization::None,
    title: title.into(),
    description: description.into(),
    points,
    initial_code: initial_code.into(),
    solution: solution.into(),
    concepts: concepts.iter().map(|c| c.to_string()).collect(),
    feedback: ContractKind::Local,
    success_message: Some(success.0.into()),
    success_explanation: Some(success.1.into()),
    hint: Some(hint.into()),
    pitfalls,
  }
}

pub fn seed_challenge_cfgs() -> Vec<ChallengeCfg> {
  vec![
    // Beginner: foundations
    local(
      "b1", Tier::Beginner, "The First Command",
      r#"Use the `print()` function to output: "Hello World""#,
      50, "", r#"print("Hello World")"#, &["Output"],
      ("Perfect Start!", "The print function tells Python to show data on the screen."),
      r#"Type: print("Hello World") exactly."#,
      vec![
        PitfallCfg::regex(r"(?i)print\(Hello World\)", "You're missing quotes!", r#"Wrap Hello World in double quotes: "Hello World""#),
        PitfallCfg::literal("Print", "Python is case-sensitive.", "Use lowercase 'print' instead of 'Print'."),
        PitfallCfg::literal(r#""Hello World""#, "You forgot the function call.", "Wrap the text inside print(...)"),
      ],
    ),
    local(
      "b2", Tier::Beginner, "The Box (Variables)",
      r#"Create a variable `name` and set it to "Python"."#,
      50, "", r#"name = "Python""#, &["Variables"],
      ("Labeled!", "You've successfully stored a string in a memory slot named 'name'."),
      r#"name = "Python""#,
      vec![
        PitfallCfg::literal(r#""name" ="#, "Don't put quotes around variable names.", r#"Change "name" to just name."#),
        PitfallCfg::literal(r#"name="Python""#, "Your syntax is mostly correct, but keep it clean!", r#"Add spaces around the = for better readability: name = "Python""#),
        PitfallCfg::literal("name ==", "Use a single = for assignment.", "Change == to ="),
      ],
    ),
    local(
      "b6", Tier::Beginner, "The If Gate",
      r#"If `x` is 5, print "Bingo"."#,
      100, "x = 5\n", "x = 5\nif x == 5:\n    print(\"Bingo\")", &["Conditionals"],
      ("Decision Made!", "Conditionals allow your program to branch based on data."),
      "if x == 5:\n    print(\"Bingo\")",
      vec![
        PitfallCfg::literal("if x = 5", "Use == to compare values.", "Change = to == in your if statement."),
        PitfallCfg::regex(r"if x == 5\s+print", "Missing colon.", "Add a colon : after the 5."),
        PitfallCfg::regex(r"if x == 5:\nprint", "Indentation error.", "Add 4 spaces before the print command."),
      ],
    ),
    // Intermediate: logic engine
    local(
      "i1", Tier::Intermediate, "The For Loop",
      "Loop through `nums = [1, 2, 3]` and print each number.",
      150, "nums = [1, 2, 3]\n", "nums = [1, 2, 3]\nfor n in nums:\n    print(n)", &["Loops"],
      ("Iterated!", "For loops let you repeat actions for every item in a collection."),
      "for n in nums:\n    print(n)",
      vec![
        PitfallCfg::regex(r"for n in nums\n", "Missing colon in loop.", "Add a colon : after 'nums'."),
        PitfallCfg::literal("for nums in n", "Variable order swapped.", "Use 'for n in nums:' (element first, then list)."),
        PitfallCfg::regex(r"for n in nums:\nprint", "Indentation missing.", "Indent the print(n) line with 4 spaces."),
      ],
    ),
    local(
      "i2", Tier::Intermediate, "Defining Functions",
      r#"Define a function `greet()` that prints "Hi"."#,
      200, "", "def greet():\n    print(\"Hi\")", &["Functions"],
      ("Reusable Code!", "Functions are blocks of code you can name and run whenever you want."),
      "def greet():\n    print(\"Hi\")",
      vec![
        PitfallCfg::literal("function greet", "Python uses 'def' for functions.", "Replace 'function' with 'def'."),
        PitfallCfg::regex(r"def greet\s*\n", "Missing parentheses or colon.", "Add (): after 'greet'."),
        PitfallCfg::regex(r"def greet\(\):\nprint", "Indentation error.", "Indent the print line inside the function."),
      ],
    ),
    local(
      "i3", Tier::Intermediate, "Mapping Data",
      r#"Create a dictionary `hero` with "hp" set to 10."#,
      150, "", r#"hero = {"hp": 10}"#, &["Dictionaries"],
      ("Structured!", "Dictionaries store data as Key:Value pairs, like a real dictionary."),
      r#"hero = {"hp": 10}"#,
      vec![
        PitfallCfg::literal(r#"hero = ["hp", 10]"#, "That's a list, not a dictionary.", "Use curly braces {} and a colon : between hp and 10."),
        PitfallCfg::literal("hero = {hp: 10}", "Keys are usually strings.", r#"Put quotes around "hp"."#),
      ],
    ),
    // Advanced: master architect
    local(
      "a1", Tier::Advanced, "The Blueprint (OOP)",
      "Create a class `Robot` with an empty body (use `pass`).",
      300, "", "class Robot:\n    pass", &["OOP", "Classes"],
      ("Architect Found!", "Classes are blueprints for creating objects with data and behavior."),
      "class Robot:\n    pass",
      vec![
        PitfallCfg::literal("def Robot", "Use 'class' to define a type.", "Replace 'def' with 'class'."),
        PitfallCfg::literal("class Robot()", "Empty parentheses aren't needed here.", "Just use 'class Robot:'."),
      ],
    ),
    local(
      "a2", Tier::Advanced, "Match-Case logic",
      r#"Use `match status:` and `case "idle":` to print "Sleep"."#,
      250, "status = \"idle\"\n", "status = \"idle\"\nmatch status:\n    case \"idle\":\n        print(\"Sleep\")", &["Pattern Matching"],
      ("Pattern Matched!", "Structural Pattern Matching (Python 3.10+) is a cleaner way to handle many conditions."),
      "match status:\n    case \"idle\":\n        print(\"Sleep\")",
      vec![
        PitfallCfg::literal("switch status", "Python uses 'match', not 'switch'.", "Change 'switch' to 'match'."),
        PitfallCfg::literal(r#"case "idle" print"#, "Missing colon after case.", r#"Add a colon : after "idle"."#),
      ],
    ),
  ]
}

/// Built-in curriculum, in declared order.
pub fn seed_curriculum() -> Vec<Challenge> {
  compile_bank(seed_challenge_cfgs())
}
