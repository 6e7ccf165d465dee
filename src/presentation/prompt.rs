// Interactive prompts over any reader/writer pair
use crate::application::provisioning_service::ConflictResolver;
use crate::domain::dashboard::ConflictDecision;
use anyhow::Context;
use std::io::{BufRead, Write};
use std::sync::Mutex;

pub struct LinePrompt<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    /// Print `question` and read one trimmed line. End of input reads as empty.
    pub fn prompt_line(&self, question: &str) -> anyhow::Result<String> {
        {
            let mut output = self
                .output
                .lock()
                .map_err(|_| anyhow::anyhow!("prompt output lock poisoned"))?;
            write!(output, "{}", question)?;
            output.flush()?;
        }

        let mut line = String::new();
        self.input
            .lock()
            .map_err(|_| anyhow::anyhow!("prompt input lock poisoned"))?
            .read_line(&mut line)
            .context("Failed to read answer")?;
        Ok(line.trim().to_string())
    }

    pub fn ask_users(&self) -> anyhow::Result<String> {
        self.prompt_line("Enter the list of users separated by comma: ")
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        match self.output.into_inner() {
            Ok(output) => output,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<R, W> ConflictResolver for LinePrompt<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn resolve_conflict(
        &self,
        name: &str,
        parent_path: &str,
        existing_id: Option<&str>,
    ) -> anyhow::Result<ConflictDecision> {
        let question = format!(
            "Dashboard '{}' already exists in {}. Update it? [y/N] ",
            name, parent_path
        );
        if !parse_yes_no(&self.prompt_line(&question)?) {
            return Ok(ConflictDecision::Skip);
        }

        let question = match existing_id {
            Some(id) => format!("Dashboard id to update [{}]: ", id),
            None => "Dashboard id to update: ".to_string(),
        };
        let answer = self.prompt_line(&question)?;
        match (answer.is_empty(), existing_id) {
            (false, _) => Ok(ConflictDecision::UpdateWithId(answer)),
            (true, Some(id)) => Ok(ConflictDecision::UpdateWithId(id.to_string())),
            (true, None) => Ok(ConflictDecision::Skip),
        }
    }
}

pub fn parse_yes_no(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompt(input: &str) -> LinePrompt<Cursor<Vec<u8>>, Vec<u8>> {
        LinePrompt::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_parse_yes_no() {
        assert!(parse_yes_no("y"));
        assert!(parse_yes_no(" YES "));
        assert!(!parse_yes_no(""));
        assert!(!parse_yes_no("no"));
    }

    #[test]
    fn test_declining_skips() {
        let prompt = prompt("n\n");
        let decision = prompt.resolve_conflict("Usage", "/Users/ana", Some("d1")).unwrap();
        assert_eq!(decision, ConflictDecision::Skip);

        let shown = String::from_utf8(prompt.into_output()).unwrap();
        assert_eq!(shown, "Dashboard 'Usage' already exists in /Users/ana. Update it? [y/N] ");
    }

    #[test]
    fn test_blank_id_uses_the_existing_one() {
        let prompt = prompt("y\n\n");
        let decision = prompt.resolve_conflict("Usage", "/Users/ana", Some("d1")).unwrap();
        assert_eq!(decision, ConflictDecision::UpdateWithId("d1".to_string()));
        assert!(String::from_utf8(prompt.into_output()).unwrap().ends_with("[d1]: "));
    }

    #[test]
    fn test_typed_id_wins() {
        let prompt = prompt("yes\nd7\n");
        let decision = prompt.resolve_conflict("Usage", "/Users/ana", Some("d1")).unwrap();
        assert_eq!(decision, ConflictDecision::UpdateWithId("d7".to_string()));
    }

    #[test]
    fn test_no_known_id_and_no_answer_skips() {
        let prompt = prompt("y\n");
        let decision = prompt.resolve_conflict("Usage", "/Users/ana", None).unwrap();
        assert_eq!(decision, ConflictDecision::Skip);
    }

    #[test]
    fn test_ask_users() {
        let prompt = prompt(" ana@example.com, bo@example.com \n");
        assert_eq!(prompt.ask_users().unwrap(), "ana@example.com, bo@example.com");
    }
}
