//! SQL schema for the Quire SQLite store.
//!
//! Executed at open time; idempotent thanks to `IF NOT EXISTS`. Later
//! migrations will be gated on `PRAGMA user_version`.

/// Pragmas applied to every connection (writer and reader alike).
pub const CONNECTION_PRAGMAS: &str = "
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
";

/// Full schema DDL.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- ── Reference data ─────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS genres (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS creators (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    slug        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS characters (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    slug        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL
);

-- ── Content hierarchy ──────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS series (
    id                   TEXT PRIMARY KEY,
    title                TEXT NOT NULL,
    slug                 TEXT NOT NULL,
    cover_url            TEXT,
    summary              TEXT NOT NULL DEFAULT '{}',   -- JSON document
    status               TEXT NOT NULL DEFAULT 'draft',
    age_rating           TEXT NOT NULL DEFAULT 'everyone',
    is_mature            INTEGER NOT NULL DEFAULT 0,
    is_public            INTEGER NOT NULL DEFAULT 0,
    is_featured          INTEGER NOT NULL DEFAULT 0,
    is_completed         INTEGER NOT NULL DEFAULT 0,
    ownership_type       TEXT NOT NULL,                -- 'individual' | 'organization'
    primary_owner_id     TEXT NOT NULL,
    original_creator_id  TEXT NOT NULL,
    keywords             TEXT NOT NULL DEFAULT '[]',
    tags                 TEXT NOT NULL DEFAULT '[]',
    purchase_price       INTEGER,
    rental_price         INTEGER,
    rental_duration_days INTEGER,
    is_premium           INTEGER NOT NULL DEFAULT 0,
    view_count           INTEGER NOT NULL DEFAULT 0,
    like_count           INTEGER NOT NULL DEFAULT 0,
    bookmark_count       INTEGER NOT NULL DEFAULT 0,
    comment_count        INTEGER NOT NULL DEFAULT 0,
    rating_average       REAL    NOT NULL DEFAULT 0,
    rating_count         INTEGER NOT NULL DEFAULT 0,
    total_volumes        INTEGER NOT NULL DEFAULT 0,
    total_chapters       INTEGER NOT NULL DEFAULT 0,
    word_count           INTEGER NOT NULL DEFAULT 0,
    published_at         TEXT,
    is_deleted           INTEGER NOT NULL DEFAULT 0,
    deleted_at           TEXT,
    deleted_by           TEXT,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL,
    CHECK (is_deleted = 0 OR deleted_at IS NOT NULL)
);

CREATE TABLE IF NOT EXISTS volumes (
    id            TEXT PRIMARY KEY,
    series_id     TEXT NOT NULL REFERENCES series(id),
    volume_number INTEGER NOT NULL CHECK (volume_number >= 1),
    title         TEXT,
    description   TEXT,
    cover_url     TEXT,
    is_available  INTEGER NOT NULL DEFAULT 1,
    price         INTEGER,
    chapter_count INTEGER NOT NULL DEFAULT 0,
    is_deleted    INTEGER NOT NULL DEFAULT 0,
    deleted_at    TEXT,
    deleted_by    TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    CHECK (is_deleted = 0 OR deleted_at IS NOT NULL)
);

CREATE TABLE IF NOT EXISTS chapters (
    id                   TEXT PRIMARY KEY,
    volume_id            TEXT NOT NULL REFERENCES volumes(id),
    chapter_number       INTEGER NOT NULL CHECK (chapter_number >= 1),
    title                TEXT,
    content              TEXT,                          -- JSON document
    published_at         TEXT,
    scheduled_publish_at TEXT,
    is_draft             INTEGER NOT NULL DEFAULT 1,
    is_public            INTEGER NOT NULL DEFAULT 0,
    version              INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1),
    word_count           INTEGER NOT NULL DEFAULT 0,
    character_count      INTEGER NOT NULL DEFAULT 0,
    reading_time_minutes INTEGER NOT NULL DEFAULT 0,
    content_warnings     TEXT NOT NULL DEFAULT '[]',
    is_mature            INTEGER NOT NULL DEFAULT 0,
    view_count           INTEGER NOT NULL DEFAULT 0,
    like_count           INTEGER NOT NULL DEFAULT 0,
    comment_count        INTEGER NOT NULL DEFAULT 0,
    is_deleted           INTEGER NOT NULL DEFAULT 0,
    deleted_at           TEXT,
    deleted_by           TEXT,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL,
    CHECK (is_deleted = 0 OR deleted_at IS NOT NULL)
);

-- Sequence numbers are unique among live siblings only; a deleted volume's
-- number may be reused.
CREATE UNIQUE INDEX IF NOT EXISTS volumes_live_number_idx
    ON volumes(series_id, volume_number) WHERE is_deleted = 0;
CREATE UNIQUE INDEX IF NOT EXISTS chapters_live_number_idx
    ON chapters(volume_id, chapter_number) WHERE is_deleted = 0;

CREATE TRIGGER IF NOT EXISTS chapters_version_monotonic
    BEFORE UPDATE OF version ON chapters
    WHEN NEW.version < OLD.version
BEGIN
    SELECT RAISE(ABORT, 'chapter version may not decrease');
END;

-- ── Associations ───────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS series_genres (
    series_id TEXT NOT NULL REFERENCES series(id),
    genre_id  TEXT NOT NULL REFERENCES genres(id),
    PRIMARY KEY (series_id, genre_id)
);

CREATE TABLE IF NOT EXISTS series_creators (
    series_id  TEXT NOT NULL REFERENCES series(id),
    creator_id TEXT NOT NULL REFERENCES creators(id),
    role       TEXT NOT NULL,
    PRIMARY KEY (series_id, creator_id, role)
);

CREATE TABLE IF NOT EXISTS series_characters (
    series_id    TEXT NOT NULL REFERENCES series(id),
    character_id TEXT NOT NULL REFERENCES characters(id),
    PRIMARY KEY (series_id, character_id)
);

-- ── Commercial records (read-only from the catalog's point of view) ────────

CREATE TABLE IF NOT EXISTS purchases (
    id           TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL,
    content_type TEXT NOT NULL CHECK (content_type IN ('series', 'volume', 'chapter')),
    content_id   TEXT NOT NULL,
    amount       INTEGER,
    purchased_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rentals (
    id           TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL,
    content_type TEXT NOT NULL CHECK (content_type IN ('series', 'volume', 'chapter')),
    content_id   TEXT NOT NULL,
    rented_at    TEXT NOT NULL,
    expires_at   TEXT
);

CREATE INDEX IF NOT EXISTS series_created_idx      ON series(created_at);
CREATE INDEX IF NOT EXISTS series_owner_idx        ON series(primary_owner_id);
CREATE INDEX IF NOT EXISTS volumes_series_idx      ON volumes(series_id);
CREATE INDEX IF NOT EXISTS chapters_volume_idx     ON chapters(volume_id);
CREATE INDEX IF NOT EXISTS chapters_scheduled_idx  ON chapters(scheduled_publish_at)
    WHERE scheduled_publish_at IS NOT NULL;
CREATE INDEX IF NOT EXISTS series_genres_genre_idx ON series_genres(genre_id);
CREATE INDEX IF NOT EXISTS purchases_content_idx   ON purchases(content_type, content_id);
CREATE INDEX IF NOT EXISTS rentals_content_idx     ON rentals(content_type, content_id);

PRAGMA user_version = 1;
";
