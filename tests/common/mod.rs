#![allow(dead_code)]

pub mod temp_files {
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Write `files` (relative path, contents) under `root`, creating parents.
    pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
        for (rel, contents) in files {
            let path = root.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, contents).unwrap();
        }
    }

    /// A scratch directory holding `files`; returns it with the path of the first file.
    pub fn spec_tree(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        write_tree(dir.path(), files);
        let spec = dir.path().join(files[0].0);
        (dir, spec)
    }

    /// Every file under `root`, relative and sorted.
    pub fn list_files(root: &Path) -> Vec<String> {
        let mut files: Vec<String> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                e.path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        files.sort();
        files
    }
}

pub mod fixtures {
    /// Multi-file shop API: the root document references a path file and
    /// component files, and enables the built-in `server` fragment.
    pub const SHOP_ROOT: &str = r#"openapi: 3.1.0
info:
  title: Shop API
  version: 1.0.0
x-project-name: shop
x-include-server: true
security:
  - bearerAuth: []
tags:
  - name: Users
paths:
  /users:
    $ref: paths/users.yaml
  /users/{id}:
    get:
      operationId: getUser
      summary: Fetch one user
      tags: [Users]
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: components/schemas/User.yaml
  /auth/login:
    post:
      operationId: Login
      summary: Log in
      tags: [Auth]
      x-public-endpoint: true
      x-codegen-custom-handler: true
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Credentials'
      responses:
        '204':
          description: logged in
components:
  securitySchemes:
    bearerAuth:
      type: http
      scheme: bearer
  schemas:
    User:
      $ref: components/schemas/User.yaml
    Credentials:
      type: object
      required: [email, password]
      properties:
        email:
          type: string
        password:
          type: string
"#;

    pub const SHOP_USERS_PATH: &str = r#"get:
  operationId: listUsers
  summary: List users
  tags: [Users]
  parameters:
    - name: limit
      in: query
      schema:
        type: integer
        format: int32
  responses:
    '200':
      description: ok
      content:
        application/json:
          schema:
            type: array
            items:
              $ref: ../components/schemas/User.yaml
"#;

    pub const SHOP_USER_SCHEMA: &str = r#"type: object
required: [id, email, createdAt]
x-codegen:
  type: entity
  repository:
    indices: [email]
    additionalMethods:
      - name: getByEmail
        params: [email]
        returns: single
  database:
    indices:
      - fields: [email]
        unique: true
properties:
  id:
    type: string
    format: uuid
  email:
    type: string
  createdAt:
    type: string
    format: date-time
  address:
    type: object
    properties:
      city:
        type: string
"#;

    pub fn shop_files() -> Vec<(&'static str, &'static str)> {
        vec![
            ("api/openapi.yaml", SHOP_ROOT),
            ("api/paths/users.yaml", SHOP_USERS_PATH),
            ("api/components/schemas/User.yaml", SHOP_USER_SCHEMA),
        ]
    }
}
