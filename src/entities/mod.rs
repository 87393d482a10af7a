//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod achievement;
pub mod activity;
pub mod challenge;
pub mod community;
pub mod community_member;
pub mod emission;
pub mod user;
pub mod user_achievement;
pub mod user_challenge;

// Re-export specific types to avoid conflicts
pub use achievement::{
    Column as AchievementColumn, Entity as Achievement, Model as AchievementModel,
};
pub use activity::{Column as ActivityColumn, Entity as Activity, Model as ActivityModel};
pub use challenge::{Column as ChallengeColumn, Entity as Challenge, Model as ChallengeModel};
pub use community::{Column as CommunityColumn, Entity as Community, Model as CommunityModel};
pub use community_member::{
    Column as CommunityMemberColumn, Entity as CommunityMember, Model as CommunityMemberModel,
};
pub use emission::{Column as EmissionColumn, Entity as Emission, Model as EmissionModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use user_achievement::{
    Column as UserAchievementColumn, Entity as UserAchievement, Model as UserAchievementModel,
};
pub use user_challenge::{
    Column as UserChallengeColumn, Entity as UserChallenge, Model as UserChallengeModel,
};
