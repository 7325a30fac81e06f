use eyre::Result;
use log::debug;

use crate::index::Retriever;
use crate::llm::Generator;

pub const SUMMARY_QUESTION: &str = "Summarize this YouTube video clearly in 4-5 bullet points.";

const PROMPT_TEMPLATE: &str = "
You are a helpful AI assistant that summarizes and answers questions
based ONLY on the YouTube transcript context provided below.

Transcript Context:
{context}

Question:
{question}

Answer clearly and concisely:
";

/// Fill the instruction template with retrieved context and the user's question.
///
/// Placeholders are substituted in a single pass, so braces inside the
/// transcript or the question are copied through literally.
pub fn render_prompt(context: &str, question: &str) -> String {
    let mut out = String::with_capacity(PROMPT_TEMPLATE.len() + context.len() + question.len());
    let mut rest = PROMPT_TEMPLATE;

    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("{context}") {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{question}") {
            out.push_str(question);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Retrieval-augmented question answering over one video's transcript
pub struct RagChain<'a> {
    retriever: &'a Retriever,
    generator: &'a dyn Generator,
}

impl<'a> RagChain<'a> {
    pub fn new(retriever: &'a Retriever, generator: &'a dyn Generator) -> Self {
        Self { retriever, generator }
    }

    pub async fn ask(&self, question: &str) -> Result<String> {
        let chunks = self.retriever.search(question, self.retriever.top_k()).await?;
        debug!("Retrieved {} chunks for question", chunks.len());

        let context = chunks.join("\n\n");
        let prompt = render_prompt(&context, question);
        self.generator.generate(&prompt).await
    }

    pub async fn summarize(&self) -> Result<String> {
        self.ask(SUMMARY_QUESTION).await
    }
}
