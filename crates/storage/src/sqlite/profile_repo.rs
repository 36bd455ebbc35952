use async_trait::async_trait;
use lingua_core::model::{Profile, ProfileId, Subscription, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, id_to_i64, map_profile_row, map_subscription_row, profile_id_from_i64, ser,
    strings_to_json, write_err,
};
use crate::repository::{ProfileRepository, StorageError};

#[async_trait]
impl ProfileRepository for SqliteRepository {
    async fn get_profile_by_user(&self, user_id: UserId) -> Result<Option<Profile>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                id, user_id, name, email, avatar, cefr_level, streak, total_hours,
                join_date, preferred_language, learning_goals
            FROM profiles
            WHERE user_id = ?1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_profile_row).transpose()
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<ProfileId, StorageError> {
        let row = sqlx::query(
            r"
            INSERT INTO profiles (
                user_id, name, email, avatar, cefr_level, streak, total_hours,
                join_date, preferred_language, learning_goals
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(user_id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                avatar = excluded.avatar,
                cefr_level = excluded.cefr_level,
                streak = excluded.streak,
                total_hours = excluded.total_hours,
                join_date = excluded.join_date,
                preferred_language = excluded.preferred_language,
                learning_goals = excluded.learning_goals
            RETURNING id
            ",
        )
        .bind(profile.user_id.to_string())
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.avatar)
        .bind(profile.cefr_level.as_str())
        .bind(i64::from(profile.streak))
        .bind(profile.total_hours)
        .bind(profile.join_date)
        .bind(profile.preferred_language.as_deref())
        .bind(strings_to_json(&profile.learning_goals)?)
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        profile_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)
    }

    async fn get_subscription(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<Subscription>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT plan, status, renewal_date, billing_cycle, next_payment, features
            FROM subscriptions
            WHERE profile_id = ?1
            ",
        )
        .bind(id_to_i64("profile_id", profile_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_subscription_row).transpose()
    }

    async fn upsert_subscription(
        &self,
        profile_id: ProfileId,
        subscription: &Subscription,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO subscriptions (
                profile_id, plan, status, renewal_date, billing_cycle, next_payment, features
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(profile_id) DO UPDATE SET
                plan = excluded.plan,
                status = excluded.status,
                renewal_date = excluded.renewal_date,
                billing_cycle = excluded.billing_cycle,
                next_payment = excluded.next_payment,
                features = excluded.features
            ",
        )
        .bind(id_to_i64("profile_id", profile_id.value())?)
        .bind(&subscription.plan)
        .bind(&subscription.status)
        .bind(subscription.renewal_date.as_deref())
        .bind(&subscription.billing_cycle)
        .bind(&subscription.next_payment)
        .bind(strings_to_json(&subscription.features)?)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }
}
