//! Prompt builders shared by every generation call

use chrono::{SecondsFormat, Utc};

/// Persona prompt stamped with the current time
pub fn system_prompt() -> String {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    format!(
        r#"You are an expert researcher. Today is {now}. Follow these instructions when responding:
  - You may be asked about events after your knowledge cutoff; when the user presents news, assume it is accurate.
  - The user is a highly experienced analyst. Do not simplify, be as detailed as possible and make sure the response is correct.
  - Be highly organized.
  - Suggest solutions the user has not considered, and anticipate their needs.
  - Treat the user as an expert in all subject matter.
  - Mistakes erode trust, so be accurate and thorough.
  - Prefer good arguments over authorities; the source itself is irrelevant.
  - Consider new technologies and contrarian ideas, not only conventional wisdom.
  - High levels of speculation or prediction are fine as long as they are flagged."#
    )
}

/// Ask for up to `num_queries` search queries on `query`
pub fn planning_prompt(query: &str, num_queries: usize, learnings: &[String]) -> String {
    let prior = if learnings.is_empty() {
        String::new()
    } else {
        format!(
            "\n\nHere are some learnings from previous research, use them to generate more specific queries: {}",
            learnings.join("\n")
        )
    };

    format!(
        r#"Given the following prompt from the user, generate a list of SERP queries to research the topic. Return exactly {num_queries} queries. Make sure each query is unique and not similar to each other: <prompt>{query}</prompt>{prior}

Example JSON is shown below. Output just the JSON with no backticks or other text.
{{
  "queries": [
    {{
      "query": "A SERP query",
      "researchGoal": "First describe the goal this query is meant to accomplish, then explain how to advance the research once results are found, and mention additional research directions. Be as specific as possible, especially for additional research directions."
    }}
  ]
}}"#
    )
}

/// Ask for learnings and follow-up questions from already-trimmed contents
pub fn distillation_prompt(
    query: &str,
    contents: &[String],
    num_learnings: usize,
    num_follow_ups: usize,
) -> String {
    let contents = contents
        .iter()
        .map(|content| format!("<content>\n{}\n</content>", content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Given the following contents from a SERP search for the query <query>{query}</query>, generate a list of learnings from the contents. Return a maximum of {num_learnings} learnings, but feel free to return less if the contents are clear. Make sure each learning is unique and not similar to each other. The learnings should be concise and to the point, as detailed and information dense as possible. Include any entities like people, places, companies, products and things, as well as any exact metrics, numbers, or dates. The learnings will be used to research the topic further. Also generate up to {num_follow_ups} follow-up questions.

Example JSON is shown below. Output just the JSON with no backticks or other text.
{{
  "learnings": ["a learning from the content"],
  "followUpQuestions": ["a follow up question"]
}}

<contents>{contents}</contents>"#
    )
}

/// Ask for the final long-form report
pub fn report_prompt(topic: &str, learnings: &str) -> String {
    format!(
        r#"Given the following prompt from the user, write a final report on the topic using the learnings from research. Make it as detailed as possible, aim for 3 or more pages, and include ALL the learnings from research:

<prompt>{topic}</prompt>

Here are all the learnings from previous research:

<learnings>
{learnings}
</learnings>

Use markdown format."#
    )
}

/// Ask for clarifying questions before research starts
pub fn feedback_prompt(query: &str, num_questions: usize) -> String {
    format!(
        r#"Given the following query from the user, ask some follow up questions to clarify the research direction. Return a maximum of {num_questions} questions, but feel free to return less if the original query is clear: <query>{query}</query>

Example JSON output:
{{
  "questions": [
    "A follow-up question"
  ]
}}"#
    )
}

/// Wrap each learning for the report prompt
pub fn format_learnings(learnings: &[String]) -> String {
    learnings
        .iter()
        .map(|learning| format!("<learning>\n{}\n</learning>", learning))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Query text for the next recursion level.
///
/// Folds the branch goal and every follow-up question into one prompt.
pub fn next_level_query(research_goal: &str, follow_up_questions: &[String]) -> String {
    let directions: String = follow_up_questions
        .iter()
        .map(|q| format!("\n{}", q))
        .collect();

    format!(
        "Previous research goal: {}\nFollow-up research directions: {}",
        research_goal, directions
    )
    .trim()
    .to_string()
}

/// Fold the user's answers to the clarifying questions into the research topic
pub fn combined_query(initial_query: &str, questions_and_answers: &[(String, String)]) -> String {
    if questions_and_answers.is_empty() {
        return initial_query.to_string();
    }

    let answers = questions_and_answers
        .iter()
        .map(|(question, answer)| format!("Q: {}\nA: {}", question, answer))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Initial Query: {}\nFollow-up Questions and Answers:\n{}",
        initial_query, answers
    )
}

/// Markdown sources section appended to every report
pub fn sources_section(visited_urls: &[String]) -> String {
    let list = visited_urls
        .iter()
        .map(|url| format!("- {}", url))
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n\n## Sources\n\n{}", list)
}
