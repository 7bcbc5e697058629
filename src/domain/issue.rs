use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueId {
	pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueStatus {
	ToDo,
	InProgress,
	Done,
}

/// A raw work item as delivered by a work-tracking connector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Issue {
	pub issue_id: Option<IssueId>,
	pub status: Option<IssueStatus>,
	pub parent: Option<IssueId>,
	pub done_date: Option<NaiveDate>,
}

impl Issue {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_done(&self) -> bool {
		self.status == Some(IssueStatus::Done)
	}

	pub fn parent_key(&self) -> Option<&str> {
		self.parent.as_ref().map(|id| id.id.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_issue_has_none_fields() {
		let issue = Issue::new();
		assert_eq!(issue.issue_id, None);
		assert_eq!(issue.status, None);
		assert_eq!(issue.parent, None);
		assert_eq!(issue.done_date, None);
		assert!(!issue.is_done());
		assert_eq!(issue.parent_key(), None);
	}

	#[test]
	fn done_issue_reports_done() {
		let mut issue = Issue::new();
		issue.issue_id = Some(IssueId { id: "ABC-1".into() });
		issue.status = Some(IssueStatus::Done);
		issue.parent = Some(IssueId { id: "ABC-0".into() });

		assert!(issue.is_done());
		assert_eq!(issue.parent_key(), Some("ABC-0"));
	}
}
