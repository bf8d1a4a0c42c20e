//! SeaORM entity models
//!
//! Database entities for BRACU Loop

mod faculty;
mod course;
mod faculty_course;
mod review;
mod review_vote;
mod suggestion_post;
mod suggestion_comment;
mod suggestion_like;
mod student_note;
mod question_paper;
mod question_download;
mod room;
mod room_schedule;
mod admin_user;
mod admin_session;
mod user_session;
mod banned_user;
mod reported_content;
mod contact_submission;

pub use faculty::{
    Entity as FacultyEntity,
    Model as Faculty,
    ActiveModel as FacultyActiveModel,
    Column as FacultyColumn,
};

pub use course::{
    Entity as CourseEntity,
    Model as Course,
    ActiveModel as CourseActiveModel,
    Column as CourseColumn,
};

pub use faculty_course::{
    Entity as FacultyCourseEntity,
    Model as FacultyCourse,
    ActiveModel as FacultyCourseActiveModel,
    Column as FacultyCourseColumn,
};

pub use review::{
    Entity as ReviewEntity,
    Model as Review,
    ActiveModel as ReviewActiveModel,
    Column as ReviewColumn,
};

pub use review_vote::{
    Entity as ReviewVoteEntity,
    Model as ReviewVote,
    ActiveModel as ReviewVoteActiveModel,
    Column as ReviewVoteColumn,
};

pub use suggestion_post::{
    Entity as SuggestionPostEntity,
    Model as SuggestionPost,
    ActiveModel as SuggestionPostActiveModel,
    Column as SuggestionPostColumn,
};

pub use suggestion_comment::{
    Entity as SuggestionCommentEntity,
    Model as SuggestionComment,
    ActiveModel as SuggestionCommentActiveModel,
    Column as SuggestionCommentColumn,
};

pub use suggestion_like::{
    Entity as SuggestionLikeEntity,
    Model as SuggestionLike,
    ActiveModel as SuggestionLikeActiveModel,
    Column as SuggestionLikeColumn,
};

pub use student_note::{
    Entity as StudentNoteEntity,
    Model as StudentNote,
    ActiveModel as StudentNoteActiveModel,
    Column as StudentNoteColumn,
};

pub use question_paper::{
    Entity as QuestionPaperEntity,
    Model as QuestionPaper,
    ActiveModel as QuestionPaperActiveModel,
    Column as QuestionPaperColumn,
};

pub use question_download::{
    Entity as QuestionDownloadEntity,
    Model as QuestionDownload,
    ActiveModel as QuestionDownloadActiveModel,
    Column as QuestionDownloadColumn,
};

pub use room::{
    Entity as RoomEntity,
    Model as Room,
    ActiveModel as RoomActiveModel,
    Column as RoomColumn,
};

pub use room_schedule::{
    Entity as RoomScheduleEntity,
    Model as RoomSchedule,
    ActiveModel as RoomScheduleActiveModel,
    Column as RoomScheduleColumn,
};

pub use admin_user::{
    Entity as AdminUserEntity,
    Model as AdminUser,
    ActiveModel as AdminUserActiveModel,
    Column as AdminUserColumn,
};

pub use admin_session::{
    Entity as AdminSessionEntity,
    Model as AdminSession,
    ActiveModel as AdminSessionActiveModel,
    Column as AdminSessionColumn,
};

pub use user_session::{
    Entity as UserSessionEntity,
    Model as UserSession,
    ActiveModel as UserSessionActiveModel,
    Column as UserSessionColumn,
};

pub use banned_user::{
    Entity as BannedUserEntity,
    Model as BannedUser,
    ActiveModel as BannedUserActiveModel,
    Column as BannedUserColumn,
};

pub use reported_content::{
    Entity as ReportedContentEntity,
    Model as ReportedContent,
    ActiveModel as ReportedContentActiveModel,
    Column as ReportedContentColumn,
};

pub use contact_submission::{
    Entity as ContactSubmissionEntity,
    Model as ContactSubmission,
    ActiveModel as ContactSubmissionActiveModel,
    Column as ContactSubmissionColumn,
};
